mod expr;
mod stmt;

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};

use log::trace;

use crate::native;
use crate::prelude::*;

type InterpreterResult = Result<Object, RuntimeError>;

/// How a statement finished. `Return` and `Break` unwind through blocks
/// until a call frame or a loop consumes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Object),
    Break,
}

pub struct Interpreter {
    pub globals: Shared<Environment>,
    environment: Shared<Environment>,
    locals: HashMap<ExprId, usize>, // expression id -> scope distance
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new().as_shared();
        let environment = globals.clone();

        native::register(&mut globals.borrow_mut());

        Self {
            globals,
            environment,
            locals: HashMap::new(),
            output: Box::new(std::io::stdout()),
            input: Box::new(BufReader::new(std::io::stdin())),
        }
    }

    /// Where `print` writes to.
    pub fn with_output(self, output: impl Write + 'static) -> Self {
        Self { output: Box::new(output), ..self }
    }

    /// Where the `input()` native reads lines from.
    pub fn with_input(self, input: impl BufRead + 'static) -> Self {
        Self { input: Box::new(input), ..self }
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    /// Record the scope distance the resolver found for an expression.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        trace!("resolved {id:?} at distance {depth}");
        self.locals.insert(id, depth);
    }

    /// Next line from the input source without its line ending, or `None`
    /// at end of stream.
    pub fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(native::strip_line_ending(line)))
    }
}
