//! Tree‑walking evaluator.
//!
//! Statements execute to a [`Flow`]: either "carry on" (with the value of an
//! expression statement, for embedders) or a `return` unwinding towards the
//! nearest call boundary.  Keeping `return` out of the error channel means a
//! runtime error can never be mistaken for, or swallowed as, a return.
//!
//! Variable access consults the resolver's table: a recorded hop distance
//! takes the fast [`Environment::get_at`] path from the *current* frame,
//! anything else is a global.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{natives, Callable, LoxFunction, INIT_METHOD};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<'a> {
    /// Fell through normally; carries an expression statement's value
    /// (`nil` for every other statement).
    Next(Value<'a>),

    /// A `return` is unwinding to the enclosing call.
    Return(Value<'a>),
}

/// Deepest nesting of Lox function and class calls before the interpreter
/// reports `Stack overflow.` instead of exhausting the host stack.
pub const MAX_CALL_DEPTH: usize = 255;

pub struct Interpreter<'a> {
    globals: EnvRef<'a>,
    environment: EnvRef<'a>,
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write + 'a>,
    call_depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter printing to stdout, with `clock` defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` statements write to `output`.
    pub fn with_output(output: Box<dyn Write + 'a>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef<'a> = Environment::new_ref(None);

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            call_depth: 0,
        }
    }

    /// Resolver callback: the expression `id` binds `depth` frames out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Runs a program and returns the value of its last statement.  The first
    /// runtime error aborts the remaining statements.
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<Value<'a>> {
        debug!("Interpreting {} statements", statements.len());

        let mut last: Value<'a> = Value::Nil;

        for stmt in statements {
            last = match self.execute(stmt)? {
                Flow::Next(value) | Flow::Return(value) => value,
            };
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");

        Ok(last)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;
                Ok(Flow::Next(value))
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Next(Value::Nil))
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Next(Value::Nil))
            }

            Stmt::Block(statements) => {
                let environment: EnvRef<'a> =
                    Environment::new_ref(Some(Rc::clone(&self.environment)));
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Next(Value::Nil))
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Next(Value::Nil))
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function: LoxFunction<'a> = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );
                Ok(Flow::Next(Value::Nil))
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<LoxClass<'a>>> = match superclass {
                    Some(expr) => Some(self.evaluate_superclass(expr)?),
                    None => None,
                };

                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                // Methods of a subclass close over an extra frame holding `super`.
                let enclosing: Option<EnvRef<'a>> = superclass.as_ref().map(|superclass| {
                    let environment: EnvRef<'a> =
                        Environment::new_ref(Some(Rc::clone(&self.environment)));
                    environment
                        .borrow_mut()
                        .define("super", Value::Class(Rc::clone(superclass)));
                    mem::replace(&mut self.environment, environment)
                });

                let mut table: HashMap<&'a str, Rc<LoxFunction<'a>>> = HashMap::new();

                for method in methods {
                    let is_initializer: bool = method.name.lexeme == INIT_METHOD;
                    let function: LoxFunction<'a> = LoxFunction::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        is_initializer,
                    );
                    table.insert(method.name.lexeme, Rc::new(function));
                }

                let class: LoxClass<'a> = LoxClass::new(name.lexeme, superclass, table);

                if let Some(enclosing) = enclosing {
                    self.environment = enclosing;
                }

                info!("Class '{}' defined", name.lexeme);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;
                Ok(Flow::Next(Value::Nil))
            }
        }
    }

    /// Runs `statements` in `environment`, restoring the previous frame on
    /// every exit path, errors included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: EnvRef<'a>,
    ) -> Result<Flow<'a>> {
        debug!("Entering block with {} statements", statements.len());

        let previous: EnvRef<'a> = mem::replace(&mut self.environment, environment);
        let result: Result<Flow<'a>> = self.execute_all(statements);
        self.environment = previous;

        debug!("Exited block");

        result
    }

    fn execute_all(&mut self, statements: &[Stmt<'a>]) -> Result<Flow<'a>> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Next(Value::Nil))
    }

    fn evaluate_superclass(&mut self, expr: &Expr<'a>) -> Result<Rc<LoxClass<'a>>> {
        match self.evaluate(expr)? {
            Value::Class(class) => Ok(class),
            _ => {
                let line: usize = match expr {
                    Expr::Variable { name, .. } => name.line,
                    _ => 0,
                };
                Err(LoxError::runtime(line, "Superclass must be a class."))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value<'a> = self.evaluate(right)?;
                self.evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;
                let right: Value<'a> = self.evaluate(right)?;
                self.evaluate_binary(left, operator, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                let mut values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value: Value<'a> = self.evaluate(value)?;

                debug!("Assigning field '{}' = {}", name.lexeme, value);

                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'a>) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, name.lexeme, name.line)
            }
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the superclass sits `distance` frames out and `this`
    /// one frame nearer, in the frame `bind` created.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token<'a>,
        method: &Token<'a>,
    ) -> Result<Value<'a>> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let Value::Class(superclass) =
            Environment::get_at(&self.environment, distance, "super", keyword.line)?
        else {
            return Err(LoxError::runtime(keyword.line, "Superclass must be a class."));
        };

        let this_distance: usize = distance.checked_sub(1).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a method.")
        })?;
        let object: Value<'a> =
            Environment::get_at(&self.environment, this_distance, "this", keyword.line)?;

        debug!(
            "super.{} resolved against class '{}'",
            method.lexeme,
            superclass.name()
        );

        match superclass.find_method(method.lexeme) {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(object)))),
            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn call_value(
        &mut self,
        callee: Value<'a>,
        paren: &Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling {} with {} argument(s)", callee, arguments.len());

        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;
                self.nested_call(paren, |interpreter| function.call(interpreter, arguments))
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;
                self.nested_call(paren, |interpreter| class.call(interpreter, arguments))
            }

            Value::NativeFunction(native) => {
                check_arity(native.arity, arguments.len(), paren)?;
                native.invoke(&arguments, paren.line)
            }

            other => {
                debug!("Attempted to call a {}", other.type_name());

                Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                ))
            }
        }
    }

    /// Runs `call` one level deeper, refusing past [`MAX_CALL_DEPTH`].  The
    /// depth is restored whether the call returns or fails.
    fn nested_call<F>(&mut self, paren: &Token<'a>, call: F) -> Result<Value<'a>>
    where
        F: FnOnce(&mut Self) -> Result<Value<'a>>,
    {
        if self.call_depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit {} reached", MAX_CALL_DEPTH);

            return Err(LoxError::runtime(paren.line, "Stack overflow."));
        }

        self.call_depth += 1;
        let result: Result<Value<'a>> = call(self);
        self.call_depth -= 1;

        result
    }

    fn evaluate_unary(&self, operator: &Token<'a>, right: Value<'a>) -> Result<Value<'a>> {
        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            // Negation coerces its operand to a number where that is unambiguous.
            TokenType::MINUS => {
                let n: Option<f64> = match &right {
                    Value::Number(n) => Some(*n),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };

                n.map(|n| Value::Number(-n))
                    .ok_or_else(|| LoxError::runtime(operator.line, "Operand must be a number."))
            }

            _ => Err(LoxError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(
        &self,
        left: Value<'a>,
        operator: &Token<'a>,
        right: Value<'a>,
    ) -> Result<Value<'a>> {
        debug!("Binary {} {} {}", left, operator.lexeme, right);

        match operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
            TokenType::PLUS => {
                return match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(LoxError::runtime(
                        operator.line,
                        "Operands must be two numbers or two strings.",
                    )),
                }
            }
            _ => {}
        }

        let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
            return Err(LoxError::runtime(operator.line, "Operands must be numbers."));
        };
        let (a, b): (f64, f64) = (*a, *b);

        match operator.token_type {
            TokenType::MINUS => Ok(Value::Number(a - b)),
            TokenType::STAR => Ok(Value::Number(a * b)),
            TokenType::SLASH => Ok(Value::Number(a / b)),
            TokenType::GREATER => Ok(Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
            TokenType::LESS => Ok(Value::Bool(a < b)),
            TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
            _ => Err(LoxError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token<'_>) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Interpreter<'static> {
        Interpreter::with_output(Box::new(io::sink()))
    }

    #[test]
    fn rejected_program_leaves_no_bindings() {
        let mut interpreter = quiet();

        // `b` resolves fine, but the stray `return` rejects the whole line.
        let result = crate::run(&mut interpreter, "{ var b = 1; print b; } return 2;");

        assert!(result.is_err());
        assert!(interpreter.locals.is_empty());
    }

    #[test]
    fn accepted_program_records_its_locals() {
        let mut interpreter = quiet();

        assert!(crate::run(&mut interpreter, "{ var b = 1; b = b + 1; }").is_ok());
        assert_eq!(interpreter.locals.len(), 2);
        assert!(interpreter.locals.values().all(|depth| *depth == 0));
    }

    #[test]
    fn call_at_depth_limit_is_refused() {
        let mut interpreter = quiet();

        interpreter.call_depth = MAX_CALL_DEPTH;
        let result = crate::run(&mut interpreter, "fun f() {} f();");

        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("Stack overflow.\n[line 1]".to_string())
        );
        assert_eq!(interpreter.call_depth, MAX_CALL_DEPTH);

        interpreter.call_depth = 0;
        assert!(crate::run(&mut interpreter, "f();").is_ok());
        assert_eq!(interpreter.call_depth, 0);
    }
}
