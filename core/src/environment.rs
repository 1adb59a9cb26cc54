//! Environment frames for variable bindings
//!
//! An Environment is one frame of bindings plus a link to its enclosing
//! frame. Frames are shared by reference: every closure keeps the frame it
//! was defined in alive, and several closures may share one frame. The
//! parent chain always ends at a root frame holding the builtins.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{CarlaeError, Result};
use crate::interner::Name;
use crate::language::Value;

/// Limits applied while evaluating in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum number of nested `evaluate` calls before an EvaluationError.
    pub max_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        EvalLimits { max_depth: 2_500 }
    }
}

struct Frame {
    bindings: FxHashMap<Name, Value>,
    parent: Option<Environment>,
    limits: EvalLimits,
}

/// A reference to one frame of the scope chain. Cloning is an Rc increment.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

impl Environment {
    /// Create a parentless frame. Only the builtin table lives here.
    pub fn root(limits: EvalLimits) -> Self {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings: FxHashMap::default(),
                parent: None,
                limits,
            })),
        }
    }

    /// Create an empty child frame whose parent is `self`.
    pub fn extend(&self) -> Self {
        let limits = self.limits();
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings: FxHashMap::default(),
                parent: Some(self.clone()),
                limits,
            })),
        }
    }

    pub fn limits(&self) -> EvalLimits {
        self.frame.borrow().limits
    }

    /// Bind `name` in this frame, replacing any local binding.
    pub fn define(&self, name: Name, value: Value) {
        let old = self.frame.borrow_mut().bindings.insert(name, value);
        drop(old);
    }

    /// Look up `name` here, then in each enclosing frame.
    pub fn lookup(&self, name: Name) -> Result<Value> {
        let mut current = self.clone();
        loop {
            let parent = {
                let frame = current.frame.borrow();
                if let Some(value) = frame.bindings.get(&name) {
                    return Ok(value.clone());
                }
                frame.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(CarlaeError::unbound(name)),
            }
        }
    }

    /// Rebind `name` in the nearest frame that already defines it.
    pub fn assign_existing(&self, name: Name, value: Value) -> Result<()> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut frame = current.frame.borrow_mut();
                if let Some(slot) = frame.bindings.get_mut(&name) {
                    let old = std::mem::replace(slot, value);
                    drop(frame);
                    drop(old);
                    return Ok(());
                }
                frame.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(CarlaeError::unbound(name)),
            }
        }
    }

    /// Remove `name` from this frame only, returning the removed value.
    pub fn remove_local(&self, name: Name) -> Result<Value> {
        let removed = self.frame.borrow_mut().bindings.remove(&name);
        removed.ok_or_else(|| CarlaeError::unbound(name))
    }
}
