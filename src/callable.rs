//! Everything that can appear to the left of `(...)`.
//!
//! [`Callable`] is the seam the interpreter dispatches through: user
//! functions and classes (whose call constructs an instance) implement it.
//! Native functions are plain host function pointers invoked directly.
//! Arity is checked by the interpreter before anything runs.

use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Name every class uses for its constructor method.
pub const INIT_METHOD: &str = "init";

pub trait Callable<'a> {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter<'a>, arguments: Vec<Value<'a>>) -> Result<Value<'a>>;
}

/// A user function: declaration plus the frame it closed over.
pub struct LoxFunction<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: EnvRef<'a>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(declaration: Rc<FunctionDecl<'a>>, closure: EnvRef<'a>, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    /// Returns a copy of this method whose closure has `this` bound to
    /// `instance`.
    pub fn bind(&self, instance: Value<'a>) -> LoxFunction<'a> {
        debug!("Binding method '{}' to {}", self.name(), instance);

        let environment: EnvRef<'a> = Environment::new_ref(Some(Rc::clone(&self.closure)));
        environment.borrow_mut().define("this", instance);

        LoxFunction::new(Rc::clone(&self.declaration), environment, self.is_initializer)
    }

    /// The instance an initializer is bound to.
    fn bound_this(&self) -> Result<Value<'a>> {
        Environment::get_at(&self.closure, 0, "this", self.declaration.name.line)
    }
}

impl<'a> Callable<'a> for LoxFunction<'a> {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter<'a>, arguments: Vec<Value<'a>>) -> Result<Value<'a>> {
        debug!("Calling user-defined function '{}'", self.name());

        // Chained to the closure, not the caller: lexical scope.
        let environment: EnvRef<'a> = Environment::new_ref(Some(Rc::clone(&self.closure)));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(param.lexeme, argument);
        }

        let flow: Flow<'a> = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return self.bound_this();
        }

        match flow {
            Flow::Return(value) => {
                debug!("Function '{}' returned: {}", self.name(), value);
                Ok(value)
            }
            Flow::Next(_) => Ok(Value::Nil),
        }
    }
}

impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// Host function signature; errors become runtime errors at the call site.
pub type NativeFn = for<'v> fn(&[Value<'v>]) -> std::result::Result<Value<'v>, String>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl NativeFunction {
    /// Calls the host function; `line` locates any error it reports.
    pub fn invoke<'a>(&self, arguments: &[Value<'a>], line: usize) -> Result<Value<'a>> {
        debug!("Calling native function '{}'", self.name);

        let result: Value<'a> = (self.func)(arguments).map_err(|e| LoxError::runtime(line, e))?;

        info!("Native function '{}' returned: {}", self.name, result);

        Ok(result)
    }
}

/// `clock()`: wall‑clock time in seconds.
fn clock<'v>(_arguments: &[Value<'v>]) -> std::result::Result<Value<'v>, String> {
    let micros: i64 = Utc::now().timestamp_micros();

    Ok(Value::Number(micros as f64 / 1_000_000.0))
}

/// Built‑ins installed into every fresh global frame.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}
