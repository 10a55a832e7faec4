//! Runtime values.
//!
//! The variant set is closed: member access, equality and display are all a
//! `match` over [`Value`].  Collections, instances, classes and callables are
//! reference types (`Rc`), so copying a `Value` never copies their contents.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDecl, LambdaDecl};
use crate::builtins::BuiltinMethod;
use crate::environment::Environment;

/// Signature of a host function exposed to scripts.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Instance(Rc<Instance>),
    Class(Rc<Class>),
    Callable(Callable),
}

/// Everything that can be invoked with `(…)` except classes.
#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Lambda(Rc<Lambda>),
    Native(Rc<Native>),
    Builtin(Rc<Builtin>),
}

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Between(usize, usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Between(min, max) => write!(f, "{} to {}", min, max),
            Arity::Variadic => write!(f, "any number of"),
        }
    }
}

/// A named function or method together with the scope it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    /// `init` methods always hand back `this`.
    pub is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Returns a copy whose closure has `this` bound to `receiver`.  The
    /// receiver is an instance for ordinary methods and the class itself for
    /// static methods.
    pub fn bind(&self, receiver: Value) -> Function {
        let env = Environment::nested(&self.closure);
        env.borrow_mut().define("this", receiver, false);

        Function::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }
}

pub struct Lambda {
    pub declaration: Rc<LambdaDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

pub struct Native {
    pub name: String,
    pub arity: Arity,
    pub func: NativeFn,
}

/// A list or string method closed over its receiver, e.g. `xs.append`.
pub struct Builtin {
    pub receiver: Value,
    pub method: BuiltinMethod,
}

impl Callable {
    fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Lambda(a), Callable::Lambda(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Builtin(a), Callable::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub static_methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Instance method lookup, walking up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_method(name)
    }

    /// Static method lookup; statics are inherited like ordinary methods.
    pub fn find_static(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.static_methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_static(name)
    }

    /// True when `name` is this class or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }

        self.superclass.as_ref().is_some_and(|s| s.is_a(name))
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }
}

/// One `(function, line)` step of an exception's journey up the call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub function: String,
    pub line: usize,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  at {} (line {})", self.function, self.line)
    }
}

/// A value raised with `throw` (or by a catchable runtime condition) that is
/// still looking for a handler.
#[derive(Debug, Clone)]
pub struct UserException {
    pub value: Value,
    pub kind: String,
    pub message: String,
    pub line: usize,
    pub traceback: Vec<TraceEntry>,
}

impl UserException {
    /// Derives kind and message from the thrown value.
    pub fn from_value(value: Value, line: usize) -> Self {
        let (kind, message) = match &value {
            Value::Instance(instance) => {
                let message = match instance.fields.borrow().get("message") {
                    Some(Value::String(s)) => s.clone(),
                    _ => value.to_string(),
                };
                (instance.class.name.clone(), message)
            }
            other => ("Exception".to_string(), other.to_string()),
        };

        Self {
            value,
            kind,
            message,
            line,
            traceback: Vec::new(),
        }
    }

    /// An exception raised by the runtime itself, e.g. division by zero.
    pub fn runtime(kind: &str, message: &str, line: usize) -> Self {
        Self {
            value: Value::String(message.to_string()),
            kind: kind.to_string(),
            message: message.to_string(),
            line,
            traceback: Vec::new(),
        }
    }

    /// Whether a `catch (kind …)` clause handles this exception.
    pub fn matches(&self, kind: &str) -> bool {
        if self.kind == kind {
            return true;
        }

        match &self.value {
            Value::Instance(instance) => instance.class.is_a(kind),
            _ => false,
        }
    }
}

impl Value {
    /// nil and false are falsey; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name reported by the `type` native.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "nil".into(),
            Value::Bool(_) => "boolean".into(),
            Value::Number(_) => "number".into(),
            Value::String(_) => "string".into(),
            Value::List(_) => "list".into(),
            Value::Map(_) => "map".into(),
            Value::Instance(instance) => instance.class.name.clone(),
            Value::Class(_) => "class".into(),
            Value::Callable(_) => "function".into(),
        }
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Writes the value the way it appears inside a list or map: strings are
    /// quoted, everything else as at top level.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            other => other.fmt_with(f, open),
        }
    }

    /// `open` holds the containers currently being written; meeting one of
    /// them again prints `[...]` or `{...}` instead of recursing.
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::List(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if open.contains(&ptr) {
                    return write!(f, "[...]");
                }

                open.push(ptr);
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }

            Value::Map(entries) => {
                let ptr = Rc::as_ptr(entries) as *const ();
                if open.contains(&ptr) {
                    return write!(f, "{{...}}");
                }

                open.push(ptr);
                write!(f, "{{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": ", key)?;
                    value.fmt_nested(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }

            other => write!(f, "{}", other),
        }
    }

    /// Structural equality for collections.  A pair already under comparison
    /// further up is assumed equal, so mutually nested lists terminate.
    fn eq_with(&self, other: &Value, pending: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if pending.contains(&pair) {
                    return true;
                }

                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }

                pending.push(pair);
                let equal = a.iter().zip(b.iter()).all(|(x, y)| x.eq_with(y, pending));
                pending.pop();
                equal
            }

            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if pending.contains(&pair) {
                    return true;
                }

                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }

                pending.push(pair);
                let equal = a
                    .iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && va.eq_with(vb, pending));
                pending.pop();
                equal
            }

            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            _ => false,
        }
    }
}

/// Renders a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => write!(f, "{}", format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::List(_) | Value::Map(_) => self.fmt_with(f, &mut Vec::new()),

            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),

            Value::Class(class) => write!(f, "<class {}>", class.name),

            Value::Callable(callable) => match callable {
                Callable::Function(func) => write!(f, "<fn {}>", func.name()),
                Callable::Lambda(_) => write!(f, "<lambda>"),
                Callable::Native(native) => write!(f, "<native fn {}>", native.name),
                Callable::Builtin(builtin) => {
                    write!(f, "<native fn {}>", builtin.method.name())
                }
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, &mut Vec::new())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.eq_with(other, &mut Vec::new())
    }
}
