//! Runtime scope frames.
//!
//! Frames are shared (`Rc<RefCell<_>>`): a closure keeps its defining frame
//! alive after the call that created it has returned, and every holder sees
//! the same live bindings.  Children point at their parent, never the other
//! way round.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a frame.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    /// Wraps a fresh frame chained to `enclosing` in a shared handle.
    pub fn new_ref(enclosing: Option<EnvRef<'a>>) -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing,
        }))
    }

    /// Binds `name` in this frame, overwriting any previous binding.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Slow path: search this frame, then each enclosing frame in turn.
    pub fn get(&self, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name.lexeme, name.line))
        }
    }

    pub fn assign(&mut self, name: &Token<'a>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name.lexeme, name.line))
        }
    }

    /// Follows exactly `distance` enclosing links from `env`.
    fn ancestor(env: &EnvRef<'a>, distance: usize, line: usize) -> Result<EnvRef<'a>> {
        let mut frame: EnvRef<'a> = Rc::clone(env);

        for _ in 0..distance {
            let parent: EnvRef<'a> = match &frame.borrow().enclosing {
                Some(parent) => Rc::clone(parent),
                None => {
                    return Err(LoxError::runtime(
                        line,
                        format!("Scope chain shorter than resolved depth {}.", distance),
                    ))
                }
            };
            frame = parent;
        }

        Ok(frame)
    }

    /// Fast path for resolved locals: no name search in intermediate frames.
    pub fn get_at(env: &EnvRef<'a>, distance: usize, name: &str, line: usize) -> Result<Value<'a>> {
        debug!("get_at '{}' distance {}", name, distance);

        let frame: EnvRef<'a> = Self::ancestor(env, distance, line)?;
        let value: Option<Value<'a>> = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| undefined_variable(name, line))
    }

    pub fn assign_at(
        env: &EnvRef<'a>,
        distance: usize,
        name: &Token<'a>,
        value: Value<'a>,
    ) -> Result<()> {
        debug!("assign_at '{}' distance {}", name.lexeme, distance);

        let frame: EnvRef<'a> = Self::ancestor(env, distance, name.line)?;
        frame.borrow_mut().values.insert(name.lexeme, value);

        Ok(())
    }
}

fn undefined_variable(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
