use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, LoxFunction, INIT_METHOD};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// A class: its name, an optional superclass and unbound methods.
#[derive(Debug)]
pub struct LoxClass<'a> {
    name: &'a str,
    superclass: Option<Rc<LoxClass<'a>>>,
    methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: &'a str,
        superclass: Option<Rc<LoxClass<'a>>>,
        methods: HashMap<&'a str, Rc<LoxFunction<'a>>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Looks `name` up on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

impl<'a> Callable<'a> for Rc<LoxClass<'a>> {
    fn arity(&self) -> usize {
        self.find_method(INIT_METHOD)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Constructs an instance and runs `init` on it, if present.  The result
    /// is always the instance, whatever `init` returned.
    fn call(&self, interpreter: &mut Interpreter<'a>, arguments: Vec<Value<'a>>) -> Result<Value<'a>> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Value<'a> = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(Rc::clone(self)))));

        if let Some(initializer) = self.find_method(INIT_METHOD) {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(instance)
    }
}

/// An object: a reference to its class plus its own fields.
#[derive(Debug)]
pub struct LoxInstance<'a> {
    class: Rc<LoxClass<'a>>,
    fields: HashMap<&'a str, Value<'a>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass<'a>> {
        &self.class
    }

    /// Reads a property.  Fields shadow methods; methods come back bound to
    /// `this`, which is why the instance is passed in as a shared value.
    pub fn get(instance: &Rc<RefCell<LoxInstance<'a>>>, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = instance.borrow().fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        let method: Option<Rc<LoxFunction<'a>>> = instance.borrow().class.find_method(name.lexeme);

        match method {
            Some(method) => {
                let bound: LoxFunction<'a> = method.bind(Value::Instance(Rc::clone(instance)));
                Ok(Value::Function(Rc::new(bound)))
            }
            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Creates or overwrites a field.
    ///
    /// Runs under a mutable borrow of the instance, so `value` must not be
    /// formatted here: its `Display` may borrow this same instance.
    pub fn set(&mut self, name: &Token<'a>, value: Value<'a>) {
        debug!("Setting field '{}' on {} instance", name.lexeme, self.class.name());

        self.fields.insert(name.lexeme, value);
    }
}
