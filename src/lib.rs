//! **rlox**: a tree‑walking interpreter for the Lox language.
//!
//! Pipeline: [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`].
//! Static stages collect every problem into a shared
//! [`Diagnostics`](error::Diagnostics); execution only starts when that
//! collector is empty.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use log::info;

use crate::ast::{Expr, Stmt};
use crate::error::{Diagnostics, LoxError, RunError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::token::Token;
use crate::value::Value;

/// Borrows raw file bytes as Lox source.  Lox is read as UTF‑8 only.
pub fn source_text(bytes: &[u8]) -> std::result::Result<&str, LoxError> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Scan, parse, resolve and execute `source` on `interpreter`.
///
/// Returns the value of the last statement.  Globals defined by `source`
/// stay in `interpreter`, so successive calls behave like REPL lines.
pub fn run<'a>(
    interpreter: &mut Interpreter<'a>,
    source: &'a str,
) -> std::result::Result<Value<'a>, RunError> {
    info!("Running {} byte(s) of source", source.len());

    let mut diagnostics: Diagnostics = Diagnostics::new();

    let tokens: Vec<Token<'a>> = scanner::scan(source, &mut diagnostics);
    let statements: Vec<Stmt<'a>> = parser::parse(&tokens, &mut diagnostics);

    if diagnostics.had_error() {
        return Err(RunError::Static(diagnostics));
    }

    resolver::resolve(interpreter, &statements, &mut diagnostics);

    if diagnostics.had_error() {
        return Err(RunError::Static(diagnostics));
    }

    interpreter.interpret(&statements).map_err(RunError::Runtime)
}

/// Run only the static stages over `source`, against a scratch interpreter.
///
/// Nothing is executed and nothing outlives the call, so a caller can vet
/// text it only holds briefly before committing to keep it.
pub fn check(source: &str) -> std::result::Result<(), RunError> {
    let mut diagnostics: Diagnostics = Diagnostics::new();

    let tokens: Vec<Token<'_>> = scanner::scan(source, &mut diagnostics);
    let statements: Vec<Stmt<'_>> = parser::parse(&tokens, &mut diagnostics);

    if !diagnostics.had_error() {
        let mut scratch: Interpreter<'_> = Interpreter::with_output(Box::new(std::io::sink()));
        resolver::resolve(&mut scratch, &statements, &mut diagnostics);
    }

    if diagnostics.had_error() {
        Err(RunError::Static(diagnostics))
    } else {
        Ok(())
    }
}

/// Scan and parse `source` as a single expression.
pub fn parse_expression(source: &str) -> std::result::Result<Expr<'_>, RunError> {
    let mut diagnostics: Diagnostics = Diagnostics::new();

    let tokens: Vec<Token<'_>> = scanner::scan(source, &mut diagnostics);

    let mut parser = Parser::new(&tokens);
    let parsed = parser.parse_expression();
    diagnostics.extend(parser.into_diagnostics());

    match parsed {
        Ok(expr) if !diagnostics.had_error() => Ok(expr),
        Ok(_) => Err(RunError::Static(diagnostics)),
        Err(e) => {
            diagnostics.report(e);
            Err(RunError::Static(diagnostics))
        }
    }
}

/// Evaluate `source` as a single expression.  A lone expression has no local
/// scopes, so every name it mentions is looked up in the globals.
pub fn evaluate<'a>(
    interpreter: &mut Interpreter<'a>,
    source: &'a str,
) -> std::result::Result<Value<'a>, RunError> {
    let expr: Expr<'a> = parse_expression(source)?;

    interpreter.evaluate(&expr).map_err(RunError::Runtime)
}
