#![allow(clippy::new_without_default)]
#![allow(clippy::vtable_address_comparisons)]

mod ast;
mod class;
mod environment;
mod error;
mod func;
mod interpreter;
mod native;
mod object;
mod parser;
mod printer;
mod resolver;
mod scanner;
mod token;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::class::*;
    pub use crate::environment::Environment;
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interpreter::{Flow, Interpreter};
    pub use crate::native::NativeHandle;
    pub use crate::object::*;
    pub use crate::parser::*;
    pub use crate::printer::AstPrinter;
    pub use crate::resolver::{Resolver, ResolverError};
    pub use crate::scanner::*;
    pub use crate::token::*;
    pub use crate::{ErrorReporter, Mgr, Shared, SharedErrorReporter};
}

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::path::Path;
use std::rc::Rc;

use log::{debug, info};

use prelude::*;

pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedErrorReporter = Shared<ErrorReporter>;

/// Runs Mgr source end to end: scan, parse, resolve, interpret.
pub struct Mgr {
    interpreter: Interpreter,
    error_reporter: SharedErrorReporter,
    dump_ast: bool,
}

impl Mgr {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
            error_reporter: Rc::new(RefCell::new(ErrorReporter::default())),
            dump_ast: false,
        }
    }

    /// Share an error reporter with the caller, e.g. to read the error flags
    /// after the run.
    pub fn with_error_reporting(self, error_reporter: SharedErrorReporter) -> Self {
        Self { error_reporter, ..self }
    }

    pub fn with_output(self, output: impl Write + 'static) -> Self {
        Self { interpreter: self.interpreter.with_output(output), ..self }
    }

    pub fn with_input(self, input: impl BufRead + 'static) -> Self {
        Self { interpreter: self.interpreter.with_input(input), ..self }
    }

    /// Print the parsed program instead of running it.
    pub fn with_dump_ast(self, dump_ast: bool) -> Self {
        Self { dump_ast, ..self }
    }

    pub fn had_error(&self) -> bool {
        self.error_reporter.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.error_reporter.borrow().had_runtime_error
    }
}

impl Mgr {
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
        let path = path.as_ref();
        info!("running {}", path.display());

        let content = std::fs::read_to_string(path)?;
        self.run(&content)
    }

    pub fn run(&mut self, input: &str) -> Result<(), anyhow::Error> {
        let tokens = match Scanner::new(input).scan_tokens() {
            Ok(tokens) => tokens,
            Err(errors) => {
                self.print_scanner_errors(errors);
                return Ok(());
            }
        };
        debug!("scanned {} tokens", tokens.len());

        let statements = match Parser::new(tokens).parse() {
            Ok(stmts) => stmts,
            Err(errors) => {
                self.print_parser_errors(errors);
                return Ok(());
            }
        };
        debug!("parsed {} statements", statements.len());

        if self.dump_ast {
            let output = self.interpreter.output();
            for stmt in &statements {
                writeln!(output, "{}", AstPrinter::stmt_to_string(stmt))?;
            }
            return Ok(());
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        if let Err(errors) = resolver.resolve(&statements) {
            let mut reporter = self.error_reporter.borrow_mut();
            errors.iter().for_each(|e| reporter.resolver_error(e));
            return Ok(());
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            self.error_reporter.borrow_mut().runtime_error(&e);
        }

        Ok(())
    }

    fn print_scanner_errors(&mut self, errors: Vec<ScannerError>) {
        let mut reporter = self.error_reporter.borrow_mut();
        errors.iter().for_each(|e| reporter.error(e.line, &e.message));
    }

    fn print_parser_errors(&mut self, errors: Vec<ParserError>) {
        let mut reporter = self.error_reporter.borrow_mut();

        for e in errors {
            if e.token.token_type == TokenType::EOF {
                reporter.report(e.token.line, "at end", &e.message);
            } else {
                reporter.report(e.token.line, &format!("at '{}'", e.token.lexeme), &e.message);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl ErrorReporter {
    pub fn error(&mut self, line: i32, message: &str) {
        self.report(line, "", message);
    }

    pub fn report(&mut self, line: i32, location: &str, message: &str) {
        if location.is_empty() {
            eprintln!("[line {line}] Error: {message}");
        } else {
            eprintln!("[line {line}] Error {location}: {message}");
        }

        self.had_error = true;
    }

    pub fn runtime_error(&mut self, e: &RuntimeError) {
        eprintln!("{e}");
        self.had_runtime_error = true;
    }

    pub fn resolver_error(&mut self, e: &ResolverError) {
        eprintln!("{e}");
        self.had_error = true;
    }
}
