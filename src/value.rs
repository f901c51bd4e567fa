//! Runtime value types for Lox

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Literal;
use crate::callable::{Callable, Class, Function, Instance, NativeFn};

/// Runtime values in Lox
#[derive(Clone)]
pub enum Value {
    /// Numeric value (IEEE-754 double)
    Number(f64),

    /// String value
    String(String),

    /// Boolean value
    Bool(bool),

    /// Nil/null value
    Nil,

    /// User function, lambda or bound method
    Function(Rc<Function>),

    /// Built-in function
    NativeFunction(NativeFn),

    /// Class definition
    Class(Rc<Class>),

    /// Class instance
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// Only `false` and `nil` are falsy. `0` and `""` are true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// The call capability of this value, if it has one
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Function(function) => Some(function.as_ref() as &dyn Callable),
            Value::NativeFunction(native) => Some(native as &dyn Callable),
            Value::Class(class) => Some(class as &dyn Callable),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display is the shortest round-trip form: 11.0 prints as "11".
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::Function(function) => match function.name() {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<lambda fn>"),
            },
            Value::NativeFunction(_) => write!(f, "<native fn>"),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class().name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            _ => write!(f, "{}", self),
        }
    }
}

/// No coercion between types. Functions, classes and instances compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => a.name == b.name,
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
