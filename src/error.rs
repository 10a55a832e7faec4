//! Centralised error hierarchy for the **Demon interpreter**.
//!
//! The scanner, parser and resolver convert their failure modes into one of the
//! [`DemonError`] variants defined here.  Runtime faults live next to the
//! interpreter ([`crate::interpreter::RuntimeError`]) because they carry a
//! traceback and never mix with the static diagnostics.
//!
//! The module **does not** print diagnostics itself: every pass hands its
//! errors to a [`Reporter`], which the driving program supplies.

use thiserror::Error;

use log::info;

use crate::interpreter::RuntimeError;
use crate::token::{Token, TokenType};

/// Canonical static error type used throughout the front end.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DemonError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either ` at 'lexeme'` or ` at end`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure (scoping or legality violation).
    #[error("[line {line}] Error at '{lexeme}': {message}")]
    Resolve {
        message: String,
        lexeme: String,
        line: usize,
    },
}

impl DemonError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        DemonError::Lex { message, line }
    }

    /// Helper constructor for the **parser**; the offending token decides the location.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();
        let location = if token.token_type == TokenType::EOF {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        info!(
            "Creating Parse error: line={}, location={}, msg={}",
            token.line, location, message
        );

        DemonError::Parse {
            message,
            location,
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, lexeme={}, msg={}",
            token.line, token.lexeme, message
        );

        DemonError::Resolve {
            message,
            lexeme: token.lexeme.clone(),
            line: token.line,
        }
    }

    /// Source line of the error.
    pub fn line(&self) -> usize {
        match self {
            DemonError::Lex { line, .. }
            | DemonError::Parse { line, .. }
            | DemonError::Resolve { line, .. } => *line,
        }
    }

    /// The bare message, without the `[line N]` prefix.
    pub fn message(&self) -> String {
        match self {
            DemonError::Lex { message, .. }
            | DemonError::Parse { message, .. }
            | DemonError::Resolve { message, .. } => message.clone(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, DemonError>;

/// Sink for diagnostics produced by the passes.
///
/// Static errors (lexing, parsing, resolving) and runtime faults go to two
/// distinct callbacks so a driver can map them to different exit codes.
pub trait Reporter {
    fn error(&mut self, error: DemonError);

    fn runtime_error(&mut self, error: RuntimeError);
}

/// A [`Reporter`] that simply records everything it is given.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub errors: Vec<DemonError>,
    pub runtime_errors: Vec<RuntimeError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_runtime_errors(&self) -> bool {
        !self.runtime_errors.is_empty()
    }

    /// Messages of all static errors, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(DemonError::message).collect()
    }
}

impl Reporter for Diagnostics {
    fn error(&mut self, error: DemonError) {
        self.errors.push(error);
    }

    fn runtime_error(&mut self, error: RuntimeError) {
        self.runtime_errors.push(error);
    }
}
