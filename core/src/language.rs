use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::{CarlaeError, Result};
use crate::interner::Name;
use crate::numeric::Number;
use crate::parser::Expression;

/// Printing stops descending past this many nested lists.
const MAX_PRINT_DEPTH: usize = 64;
/// Printing stops after this many cells of a single list.
const MAX_PRINT_CELLS: usize = 10_000;

// ============================================================================
// Core Type System
// ============================================================================

/// A cons cell. `tail` is conventionally another pair or `nil`.
pub struct Pair {
    head: Value,
    tail: Value,
}

impl Pair {
    pub fn head(&self) -> Value {
        self.head.clone()
    }

    pub fn tail(&self) -> Value {
        self.tail.clone()
    }
}

// Unlink long lists iteratively instead of recursing once per cell.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = std::mem::replace(&mut self.tail, Value::Nil);
        while let Value::Pair(cell) = next {
            match Rc::try_unwrap(cell) {
                Ok(mut owned) => next = std::mem::replace(&mut owned.tail, Value::Nil),
                Err(_) => break,
            }
        }
    }
}

/// A user-defined function closed over its defining environment.
pub struct Function {
    pub params: Vec<Name>,
    pub body: Expression,
    pub env: Environment,
}

// Environments can be cyclic through closures, so only the signature is shown.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .field("body", &self.body.to_string())
            .field("env", &"<environment>")
            .finish()
    }
}

/// Native function type - Rust functions callable from Carlae.
///
/// The environment is the caller's, used only to apply callables passed in
/// as arguments (`map`, `filter`, `reduce`).
pub type NativeFn = fn(&[Value], &Environment) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: NativeFn,
}

#[derive(Clone)]
pub enum Value {
    Number(Number),
    Bool(bool),
    Function(Rc<Function>),
    Builtin(Builtin),
    Pair(Rc<Pair>),
    Nil,
}

// ============================================================================
// Constructors and Accessors
// ============================================================================

pub fn pair(head: Value, tail: Value) -> Value {
    Value::Pair(Rc::new(Pair { head, tail }))
}

impl Value {
    pub fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    /// Build a proper list right to left, ending in `nil`.
    pub fn from_vec(items: Vec<Value>) -> Value {
        items
            .into_iter()
            .rev()
            .fold(Value::Nil, |acc, item| pair(item, acc))
    }

    /// Only `@f` is false; `nil`, zero and everything else are true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Pair(_) => "pair",
            Value::Nil => "nil",
        }
    }

    pub fn as_number(&self, what: &str) -> Result<Number> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(CarlaeError::evaluation(format!(
                "{what}: expected number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_pair(&self, what: &str) -> Result<&Rc<Pair>> {
        match self {
            Value::Pair(cell) => Ok(cell),
            other => Err(CarlaeError::evaluation(format!(
                "{what}: expected pair, got {}",
                other.type_name()
            ))),
        }
    }

    /// True when the tail chain ends in `nil` without hitting a non-pair.
    pub fn is_list(&self) -> bool {
        let mut current = self.clone();
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(cell) => current = cell.tail(),
                _ => return false,
            }
        }
    }

    /// Convert a proper list to a `Vec`, failing on improper lists.
    pub fn list_to_vec(&self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut current = self.clone();
        loop {
            match current {
                Value::Nil => return Ok(items),
                Value::Pair(cell) => {
                    items.push(cell.head());
                    current = cell.tail();
                }
                other => {
                    return Err(CarlaeError::evaluation(format!(
                        "expected a list, found a tail of type {}",
                        other.type_name()
                    )));
                }
            }
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// Pairs and functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            _ => false,
        }
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    match value {
        Value::Number(n) => write!(f, "{n}"),
        Value::Bool(true) => write!(f, "@t"),
        Value::Bool(false) => write!(f, "@f"),
        Value::Nil => write!(f, "nil"),
        Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
        Value::Function(func) => {
            write!(f, "<function (")?;
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{param}")?;
            }
            write!(f, ")>")
        }
        Value::Pair(_) if depth >= MAX_PRINT_DEPTH => write!(f, "(...)"),
        Value::Pair(first) => {
            write!(f, "(")?;
            let mut cell = first.clone();
            let mut printed = 0;
            loop {
                write_value(f, &cell.head(), depth + 1)?;
                printed += 1;
                match cell.tail() {
                    Value::Nil => break,
                    Value::Pair(next) => {
                        if printed >= MAX_PRINT_CELLS {
                            write!(f, " ...")?;
                            break;
                        }
                        write!(f, " ")?;
                        cell = next;
                    }
                    other => {
                        write!(f, " . ")?;
                        write_value(f, &other, depth + 1)?;
                        break;
                    }
                }
            }
            write!(f, ")")
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}
