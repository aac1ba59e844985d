//! One interpreter session: scan → parse → resolve → interpret.
//!
//! The session owns everything that must survive between `run` calls on
//! the same program state (the REPL feeds it one line at a time):
//! the interpreter with its globals and resolution table, the next free
//! expression id, and the two error flags the driver turns into an exit
//! status.  Nothing here is process-global, so independent sessions can
//! run side by side.

use std::io::Write;

use log::{debug, info};

use crate::error::WagagoError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// What happened to one unit of source text.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every statement ran to completion.
    Completed,

    /// Scan, parse or resolve errors; nothing was executed.
    StaticErrors(Vec<WagagoError>),

    /// Execution stopped at the first runtime fault.  Output produced by
    /// earlier statements has already been written.
    RuntimeError(WagagoError),
}

impl RunOutcome {
    /// Diagnostics in the order they were found.
    pub fn diagnostics(&self) -> Vec<&WagagoError> {
        match self {
            RunOutcome::Completed => Vec::new(),
            RunOutcome::StaticErrors(errors) => errors.iter().collect(),
            RunOutcome::RuntimeError(error) => vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

pub struct Session {
    interpreter: Interpreter,
    next_expr_id: usize,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session printing to stdout.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// A session whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(output))
    }

    fn with_interpreter(interpreter: Interpreter) -> Self {
        info!("Session created");
        Self {
            interpreter,
            next_expr_id: 0,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Run one unit of source text against this session's state.
    ///
    /// Static errors from every stage that ran are collected and suppress
    /// execution of the whole unit.  Declarations from earlier successful
    /// units stay visible.
    pub fn run(&mut self, source: &str) -> RunOutcome {
        info!("Running {} bytes of source", source.len());

        let (tokens, mut errors) = Scanner::new(source).scan_all();

        let mut parser = Parser::with_first_id(tokens, self.next_expr_id);
        let parsed = parser.parse();
        self.next_expr_id = parser.next_id();

        let statements: Vec<Stmt> = match parsed {
            Ok(statements) if errors.is_empty() => statements,
            Ok(_) => return self.static_failure(errors),
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return self.static_failure(errors);
            }
        };

        if let Err(resolve_errors) = Resolver::new(&mut self.interpreter).resolve(&statements) {
            return self.static_failure(resolve_errors);
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => RunOutcome::Completed,
            Err(e) => {
                debug!("Run ended with runtime fault: {}", e);
                self.had_runtime_error = true;
                RunOutcome::RuntimeError(e)
            }
        }
    }

    fn static_failure(&mut self, errors: Vec<WagagoError>) -> RunOutcome {
        debug!("Run rejected with {} static error(s)", errors.len());
        self.had_error = true;
        RunOutcome::StaticErrors(errors)
    }

    /// A scan, parse or resolve error was reported since the last reset.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// A runtime fault was reported since the last reset.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clear both flags; the REPL does this after every line.
    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

/// Scan `source` completely, returning the tokens (always ending in `EOF`)
/// alongside any lexical errors.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<WagagoError>) {
    Scanner::new(source).scan_all()
}

/// Scan and parse `source` without resolving or running it.
pub fn parse(source: &str) -> Result<Vec<Stmt>, Vec<WagagoError>> {
    let (tokens, mut errors) = tokenize(source);

    match Parser::new(tokens).parse() {
        Ok(statements) if errors.is_empty() => Ok(statements),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            Err(errors)
        }
    }
}
