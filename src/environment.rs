use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

/// A single name → value slot and whether it may be reassigned.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub constant: bool,
}

/// One runtime scope.  Scopes form a chain through `enclosing`; closures keep
/// the scope they were created in alive by holding an `Rc` to it.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Binding>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Shorthand for a fresh scope nested in `enclosing`, already wrapped.
    pub fn nested(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Self::with_enclosing(Rc::clone(enclosing))))
    }

    /// Defines (or redefines) `name` in this scope.
    pub fn define(&mut self, name: &str, value: Value, constant: bool) {
        trace!("define {} (constant={})", name, constant);

        self.values
            .insert(name.to_string(), Binding { value, constant });
    }

    pub fn get(&self, name: &str) -> Result<Value, String> {
        if let Some(binding) = self.values.get(name) {
            Ok(binding.value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), String> {
        if let Some(binding) = self.values.get_mut(name) {
            if binding.constant {
                return Err(format!("Cannot reassign constant '{}'.", name));
            }
            binding.value = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Walks `distance` links up the chain starting at `env`.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Reads `name` from exactly the scope `distance` hops up.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
    ) -> Result<Value, String> {
        let scope = Self::ancestor(env, distance)
            .ok_or_else(|| format!("Undefined variable '{}'.", name))?;

        let scope = scope.borrow();

        scope
            .values
            .get(name)
            .map(|binding| binding.value.clone())
            .ok_or_else(|| format!("Undefined variable '{}'.", name))
    }

    /// Assigns `name` in exactly the scope `distance` hops up.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> Result<(), String> {
        let scope = Self::ancestor(env, distance)
            .ok_or_else(|| format!("Undefined variable '{}'.", name))?;

        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(binding) if binding.constant => {
                Err(format!("Cannot reassign constant '{}'.", name))
            }
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(format!("Undefined variable '{}'.", name)),
        }
    }
}
