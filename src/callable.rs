//! Callable runtime objects: functions, natives, classes and instances
//!
//! These sit on top of the environment chain. A [`Function`] is a declaration plus the scope
//! it closed over; binding a method wraps that scope in one more holding `this`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{ErrorKind, LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Span;
use crate::value::Value;

/// Name of the method run by `Class(...)` on the fresh instance.
pub const INITIALIZER: &str = "init";

/// Anything that can appear on the left of a call
pub trait Callable {
    fn arity(&self) -> usize;

    /// `args.len() == self.arity()` has already been checked by the caller.
    fn call(&self, interpreter: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value>;
}

/// Native function type
pub type NativeFnPtr = fn(&[Value]) -> Value;

/// Native/built-in function
#[derive(Clone, Copy)]
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(name: &'static str, arity: usize, func: NativeFnPtr) -> Self {
        Self { name, arity, func }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFn {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
        Ok((self.func)(&args))
    }
}

/// `clock()`: milliseconds since the Unix epoch
pub fn clock(_args: &[Value]) -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as f64)
        .unwrap_or(0.0);
    Value::Number(millis)
}

/// User-defined function, lambda or bound method
#[derive(Clone)]
pub struct Function {
    decl: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            decl,
            closure,
            is_initializer,
        }
    }

    /// `None` for lambdas
    pub fn name(&self) -> Option<&str> {
        self.decl.name.as_ref().map(|ident| ident.name.as_str())
    }

    /// Same declaration, closure extended with `this` bound to `receiver`.
    pub fn bind(&self, receiver: Value) -> Function {
        let mut scope = Environment::with_parent(Rc::clone(&self.closure));
        scope.define("this", receiver);
        Function {
            decl: Rc::clone(&self.decl),
            closure: scope.into_ref(),
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
        let mut scope = Environment::with_parent(Rc::clone(&self.closure));
        for (param, arg) in self.decl.params.iter().zip(args) {
            scope.define(param.name.clone(), arg);
        }

        let flow = interpreter.execute_block(&self.decl.body, scope.into_ref())?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.decl.span);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break => Value::Nil,
        })
    }
}

/// A class: its methods, its class-side methods and an optional superclass
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Function>,
    class_methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Function>,
        class_methods: HashMap<String, Function>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            class_methods,
        }
    }

    /// Look up an instance method here, then up the superclass chain
    pub fn find_method(&self, name: &str) -> Option<&Function> {
        self.methods
            .get(name)
            .or_else(|| self.superclass.as_deref().and_then(|sup| sup.find_method(name)))
    }

    /// Look up a class-side method here, then up the superclass chain
    pub fn find_class_method(&self, name: &str) -> Option<&Function> {
        self.class_methods
            .get(name)
            .or_else(|| self.superclass.as_deref().and_then(|sup| sup.find_class_method(name)))
    }

    /// Property access on the class itself: a class-side method bound to the class
    pub fn get(class: &Rc<Class>, name: &str, span: Span) -> Result<Value> {
        match class.find_class_method(name) {
            Some(method) => {
                let bound = method.bind(Value::Class(Rc::clone(class)));
                Ok(Value::Function(Rc::new(bound)))
            }
            None => Err(LoxError::at(ErrorKind::UndefinedProperty(name.to_string()), span)),
        }
    }
}

impl Callable for Rc<Class> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    fn call(&self, interpreter: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(self))));

        if let Some(init) = self.find_method(INITIALIZER) {
            init.bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance: a class reference and its own fields
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Fields shadow methods. Methods come back bound to this instance.
    pub fn get(this: &Rc<RefCell<Instance>>, name: &str, span: Span) -> Result<Value> {
        let instance = this.borrow();

        if let Some(value) = instance.fields.get(name) {
            return Ok(value.clone());
        }

        let bound = instance
            .class
            .find_method(name)
            .map(|method| method.bind(Value::Instance(Rc::clone(this))));

        match bound {
            Some(method) => Ok(Value::Function(Rc::new(method))),
            None => Err(LoxError::at(ErrorKind::UndefinedProperty(name.to_string()), span)),
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
