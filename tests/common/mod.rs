#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rlox::error::RunError;
use rlox::interpreter::Interpreter;

/// `Write` sink whose bytes stay readable after the interpreter owns it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `source` on a fresh interpreter and returns what it printed.
pub fn run_program(source: &str) -> Result<String, RunError> {
    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));

    rlox::run(&mut interpreter, source)?;

    Ok(buffer.contents())
}

/// Runs `source` and returns what it printed before the run failed.
pub fn run_failing(source: &str) -> (String, RunError) {
    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));

    match rlox::run(&mut interpreter, source) {
        Ok(value) => panic!("expected failure, program returned {}", value),
        Err(e) => (buffer.contents(), e),
    }
}
