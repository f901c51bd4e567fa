//! Variable environment for Lox
//!
//! Scopes are `Rc<RefCell<Environment>>` linked to their parent. A closure keeps the scope it
//! was created in alive for as long as the closure itself is reachable, and every holder sees
//! assignments made through any other holder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorKind, LoxError, Result};
use crate::token::Span;
use crate::value::Value;

/// Shared handle to a scope
pub type EnvRef = Rc<RefCell<Environment>>;

/// Variable environment with lexical scoping
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            parent: None,
        }
    }

    /// Create a child environment with parent scope
    pub fn with_parent(parent: EnvRef) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap into a shareable handle
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Define (or redefine) a variable in this scope
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Get a variable's value, searching outwards through parent scopes
    pub fn get(&self, name: &str, span: Span) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name, span)
        } else {
            Err(LoxError::at(ErrorKind::UndefinedVariable(name.to_string()), span))
        }
    }

    /// Assign to an existing variable, searching outwards through parent scopes
    pub fn assign(&mut self, name: &str, value: Value, span: Span) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value, span)
        } else {
            Err(LoxError::at(ErrorKind::UndefinedVariable(name.to_string()), span))
        }
    }

    /// The scope exactly `distance` parent links above `env`.
    ///
    /// Returns `None` if the chain is shorter than that.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let parent = current.borrow().parent.clone()?;
            current = parent;
        }
        Some(current)
    }

    /// Read `name` from the scope `distance` hops up, without searching further.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str, span: Span) -> Result<Value> {
        let scope = Self::ancestor(env, distance);
        scope
            .as_ref()
            .and_then(|scope| scope.borrow().values.get(name).cloned())
            .ok_or_else(|| LoxError::at(ErrorKind::UndefinedVariable(name.to_string()), span))
    }

    /// Write `name` into the scope `distance` hops up, without searching further.
    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &str,
        value: Value,
        span: Span,
    ) -> Result<()> {
        let scope = Self::ancestor(env, distance)
            .ok_or_else(|| LoxError::at(ErrorKind::UndefinedVariable(name.to_string()), span))?;
        scope.borrow_mut().define(name, value);
        Ok(())
    }
}
