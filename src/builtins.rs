//! Host‑provided behaviour: list and string pseudo‑methods, and the native
//! global functions every interpreter starts with.

use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::value::{Arity, Builtin, Callable, Native, Value};

/// Methods reachable through `receiver.name` on lists and strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMethod {
    Append,
    Pop,
    Insert,
    Remove,
    Index,
    Count,
    Upper,
    Lower,
    Trim,
    Split,
    Replace,
}

impl BuiltinMethod {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinMethod::Append => "append",
            BuiltinMethod::Pop => "pop",
            BuiltinMethod::Insert => "insert",
            BuiltinMethod::Remove => "remove",
            BuiltinMethod::Index => "index",
            BuiltinMethod::Count => "count",
            BuiltinMethod::Upper => "upper",
            BuiltinMethod::Lower => "lower",
            BuiltinMethod::Trim => "trim",
            BuiltinMethod::Split => "split",
            BuiltinMethod::Replace => "replace",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            BuiltinMethod::Append
            | BuiltinMethod::Remove
            | BuiltinMethod::Index
            | BuiltinMethod::Count => Arity::Fixed(1),
            BuiltinMethod::Pop | BuiltinMethod::Split => Arity::Between(0, 1),
            BuiltinMethod::Insert | BuiltinMethod::Replace => Arity::Fixed(2),
            BuiltinMethod::Upper | BuiltinMethod::Lower | BuiltinMethod::Trim => Arity::Fixed(0),
        }
    }

    fn for_list(name: &str) -> Option<Self> {
        match name {
            "append" => Some(BuiltinMethod::Append),
            "pop" => Some(BuiltinMethod::Pop),
            "insert" => Some(BuiltinMethod::Insert),
            "remove" => Some(BuiltinMethod::Remove),
            "index" => Some(BuiltinMethod::Index),
            "count" => Some(BuiltinMethod::Count),
            _ => None,
        }
    }

    fn for_string(name: &str) -> Option<Self> {
        match name {
            "upper" => Some(BuiltinMethod::Upper),
            "lower" => Some(BuiltinMethod::Lower),
            "trim" => Some(BuiltinMethod::Trim),
            "split" => Some(BuiltinMethod::Split),
            "replace" => Some(BuiltinMethod::Replace),
            _ => None,
        }
    }
}

/// Resolves `receiver.name` for lists and strings: `length` yields a number,
/// method names yield a callable bound to the receiver.  `None` means the
/// receiver has no such member.
pub fn property(receiver: &Value, name: &str) -> Option<Value> {
    let method = match receiver {
        Value::List(items) => {
            if name == "length" {
                return Some(Value::Number(items.borrow().len() as f64));
            }
            BuiltinMethod::for_list(name)?
        }

        Value::String(s) => {
            if name == "length" {
                return Some(Value::Number(s.chars().count() as f64));
            }
            BuiltinMethod::for_string(name)?
        }

        _ => return None,
    };

    Some(Value::Callable(Callable::Builtin(Rc::new(Builtin {
        receiver: receiver.clone(),
        method,
    }))))
}

/// Converts a number to an index if it is a whole number.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
        _ => None,
    }
}

/// Maps a possibly negative index onto `0..len`.
fn normalise_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if index < 0 { index + len } else { index };

    (0..len).contains(&i).then_some(i as usize)
}

fn expect_string<'v>(value: &'v Value, method: &str) -> Result<&'v str, String> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(format!(
            "{}() expects a string argument, got {}.",
            method,
            other.type_name()
        )),
    }
}

/// Invokes a bound pseudo‑method.  Arity has already been checked.
pub fn call_method(builtin: &Builtin, args: &[Value]) -> Result<Value, String> {
    let method = builtin.method;

    debug!("Calling builtin method {}", method.name());

    match &builtin.receiver {
        Value::List(items) => match method {
            BuiltinMethod::Append => {
                items.borrow_mut().push(args[0].clone());
                Ok(builtin.receiver.clone())
            }

            BuiltinMethod::Pop => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err("Cannot pop from an empty list.".to_string());
                }

                let len = items.len();
                let index = match args.first() {
                    Some(arg) => {
                        let i = as_integer(arg)
                            .ok_or_else(|| "List index must be an integer.".to_string())?;
                        normalise_index(i, len)
                            .ok_or_else(|| format!("List index {} out of range.", i))?
                    }
                    None => len - 1,
                };

                Ok(items.remove(index))
            }

            BuiltinMethod::Insert => {
                let mut items = items.borrow_mut();
                let len = items.len() as i64;
                let i = as_integer(&args[0])
                    .ok_or_else(|| "List index must be an integer.".to_string())?;
                let at = if i < 0 { (i + len).max(0) } else { i.min(len) };

                items.insert(at as usize, args[1].clone());
                drop(items);

                Ok(builtin.receiver.clone())
            }

            BuiltinMethod::Remove => {
                let position = items.borrow().iter().position(|v| *v == args[0]);
                let position =
                    position.ok_or_else(|| format!("{} is not in the list.", args[0]))?;

                items.borrow_mut().remove(position);

                Ok(builtin.receiver.clone())
            }

            BuiltinMethod::Index => {
                let position = items.borrow().iter().position(|v| *v == args[0]);

                position
                    .map(|i| Value::Number(i as f64))
                    .ok_or_else(|| format!("{} is not in the list.", args[0]))
            }

            BuiltinMethod::Count => {
                let n = items.borrow().iter().filter(|v| **v == args[0]).count();
                Ok(Value::Number(n as f64))
            }

            other => Err(format!("Lists have no method '{}'.", other.name())),
        },

        Value::String(s) => match method {
            BuiltinMethod::Upper => Ok(Value::String(s.to_uppercase())),

            BuiltinMethod::Lower => Ok(Value::String(s.to_lowercase())),

            BuiltinMethod::Trim => Ok(Value::String(s.trim().to_string())),

            BuiltinMethod::Split => {
                let sep = match args.first() {
                    Some(arg) => expect_string(arg, "split")?,
                    None => " ",
                };

                if sep.is_empty() {
                    return Err("Empty separator.".to_string());
                }

                let parts = s
                    .split(sep)
                    .map(|part| Value::String(part.to_string()))
                    .collect();

                Ok(Value::list(parts))
            }

            BuiltinMethod::Replace => {
                let old = expect_string(&args[0], "replace")?;
                let new = expect_string(&args[1], "replace")?;

                Ok(Value::String(s.replace(old, new)))
            }

            other => Err(format!("Strings have no method '{}'.", other.name())),
        },

        other => Err(format!(
            "{} has no method '{}'.",
            other.type_name(),
            method.name()
        )),
    }
}

// ───────────────────────────── native globals ─────────────────────────────

fn clock(_args: &[Value]) -> Result<Value, String> {
    let millis = Utc::now().timestamp_millis();

    Ok(Value::Number(millis as f64 / 1000.0))
}

fn len(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::List(items) => Ok(Value::Number(items.borrow().len() as f64)),
        Value::Map(entries) => Ok(Value::Number(entries.borrow().len() as f64)),
        other => Err(format!("len() does not accept {}.", other.type_name())),
    }
}

fn to_str(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].to_string()))
}

fn type_of(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].type_name()))
}

/// Reduces the numeric arguments of `max`/`min` with `pick`.
fn extreme(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value, String> {
    let mut best: Option<f64> = None;

    for arg in args {
        let Value::Number(n) = arg else {
            return Err(format!("{}() expects numbers, got {}.", name, arg.type_name()));
        };
        best = Some(best.map_or(*n, |b| pick(b, *n)));
    }

    best.map(Value::Number)
        .ok_or_else(|| format!("{}() expects at least one argument.", name))
}

fn max(args: &[Value]) -> Result<Value, String> {
    extreme("max", args, f64::max)
}

fn min(args: &[Value]) -> Result<Value, String> {
    extreme("min", args, f64::min)
}

/// The native functions installed into every fresh global environment.
pub fn natives() -> Vec<Native> {
    vec![
        Native {
            name: "clock".to_string(),
            arity: Arity::Fixed(0),
            func: clock,
        },
        Native {
            name: "len".to_string(),
            arity: Arity::Fixed(1),
            func: len,
        },
        Native {
            name: "str".to_string(),
            arity: Arity::Fixed(1),
            func: to_str,
        },
        Native {
            name: "max".to_string(),
            arity: Arity::Variadic,
            func: max,
        },
        Native {
            name: "min".to_string(),
            arity: Arity::Variadic,
            func: min,
        },
        Native {
            name: "type".to_string(),
            arity: Arity::Fixed(1),
            func: type_of,
        },
    ]
}
