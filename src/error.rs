//! Centralised error hierarchy for the **Wagago interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum WagagoError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,

        /// `" at end"` or `" at '<lexeme>'"`.
        location: String,
    },

    /// Static‑analysis failure found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime fault raised while evaluating.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// `std::io::Error` is neither `Clone` nor `PartialEq`, so the message is
/// kept instead of the error itself.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("I/O error: {0}")]
pub struct IoError(pub String);

impl From<io::Error> for WagagoError {
    fn from(err: io::Error) -> Self {
        WagagoError::Io(IoError(err.to_string()))
    }
}

/// Location hint shared by parse and resolve diagnostics.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl WagagoError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        WagagoError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        WagagoError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        WagagoError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for **runtime** faults.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        WagagoError::Runtime {
            message,
            line: token.line,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, WagagoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_errors_carry_location_hints() {
        let semi = Token::new(TokenType::SEMICOLON, ";", 3);
        let eof = Token::new(TokenType::EOF, "", 9);

        assert_eq!(
            WagagoError::parse(&semi, "Expect expression.").to_string(),
            "[line 3] Error at ';': Expect expression."
        );
        assert_eq!(
            WagagoError::parse(&eof, "Expect '}' after block.").to_string(),
            "[line 9] Error at end: Expect '}' after block."
        );
        assert_eq!(
            WagagoError::lex(2, "Unterminated string.").to_string(),
            "[line 2] Error: Unterminated string."
        );
    }

    #[test]
    fn runtime_fault_puts_line_after_message() {
        let minus = Token::new(TokenType::MINUS, "-", 4);
        let err = WagagoError::runtime(&minus, "Operand must be a number.");

        assert_eq!(err.to_string(), "Operand must be a number.\n[line 4]");
    }
}
