//! Pipeline driver: scan → parse → resolve → interpret.
//!
//! A [`Session`] owns one interpreter, so globals survive from one
//! [`Session::run`] to the next.  That is what the REPL relies on.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{DemonError, Reporter};
use crate::interpreter::{Interpreter, RuntimeError};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// Outcome of running one source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// Lexing, parsing or resolving failed; nothing was executed.
    StaticError,
    /// Execution halted on a fault or an uncaught exception.
    RuntimeError,
}

impl RunStatus {
    /// Process exit code for a script run.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::StaticError => 65,
            RunStatus::RuntimeError => 70,
        }
    }
}

/// Forwards to another reporter while counting static errors.
struct Counting<'r> {
    inner: &'r mut dyn Reporter,
    errors: usize,
}

impl Reporter for Counting<'_> {
    fn error(&mut self, error: DemonError) {
        self.errors += 1;
        self.inner.error(error);
    }

    fn runtime_error(&mut self, error: RuntimeError) {
        self.inner.runtime_error(error);
    }
}

/// Scans and parses `source`.  Returns the surviving statements and whether
/// any static error was reported.
pub fn parse_source(source: &str, reporter: &mut dyn Reporter) -> (Vec<Stmt>, bool) {
    let (statements, _, had_error) = parse_from(source, 0, reporter);
    (statements, had_error)
}

fn parse_from(
    source: &str,
    first_id: usize,
    reporter: &mut dyn Reporter,
) -> (Vec<Stmt>, usize, bool) {
    let mut counting = Counting {
        inner: reporter,
        errors: 0,
    };

    let (tokens, lex_errors) = scan_tokens(source);
    for error in lex_errors {
        counting.error(error);
    }

    let mut parser = Parser::with_first_id(tokens, first_id);
    let statements = parser.parse(&mut counting);

    (statements, parser.next_id(), counting.errors > 0)
}

pub struct Session {
    interpreter: Interpreter,
    /// First node id the next parsed unit may use.
    next_id: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// A session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        info!("Session created");

        Self {
            interpreter,
            next_id: 0,
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Runs one source unit against the session's interpreter.
    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> RunStatus {
        debug!("Running source unit ({} bytes)", source.len());

        let (statements, next_id, had_error) = parse_from(source, self.next_id, reporter);
        self.next_id = next_id;

        if had_error {
            info!("Static errors found; not executing");
            return RunStatus::StaticError;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        if !resolver.resolve(&statements, reporter) {
            info!("Resolution errors found; not executing");
            return RunStatus::StaticError;
        }

        if self.interpreter.interpret(&statements, reporter) {
            RunStatus::Ok
        } else {
            RunStatus::RuntimeError
        }
    }
}

/// Writes every diagnostic to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn error(&mut self, error: DemonError) {
        debug!("Static error: {}", error);
        eprintln!("{}", error);
    }

    fn runtime_error(&mut self, error: RuntimeError) {
        debug!("Runtime error: {}", error.message);
        eprintln!("{}", error);
    }
}
