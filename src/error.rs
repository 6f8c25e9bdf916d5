//! Centralised error hierarchy for the **sprig interpreter**.
//!
//! Lexing failures are hard errors (the source cannot be tokenized at all),
//! parse errors are accumulated and reported together, and runtime failures
//! arrive as a [`RuntimeError`] built by the evaluator.  All of them can be
//! lifted into [`SprigError`] so embedders get one `Result<T>` alias and
//! ergonomic inter-operation with `anyhow`.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::diagnostics::RuntimeError;
use crate::token::{Position, Token, TokenKind};

/// Fatal lexer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LexError {
    #[error("[{position}] Error: Unterminated string.")]
    UnterminatedString { position: Position },

    #[error("[{position}] Error: Unterminated f-string.")]
    UnterminatedFString { position: Position },

    #[error("[{position}] Error: Unmatched '}}' in f-string.")]
    UnmatchedBrace { position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString { position }
            | LexError::UnterminatedFString { position }
            | LexError::UnmatchedBrace { position } => *position,
        }
    }
}

/// A single syntax error; the parser collects these instead of stopping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
    pub token: Token,
}

impl ParseError {
    pub fn new<S: Into<String>>(message: S, token: &Token) -> Self {
        let message: String = message.into();

        info!("Creating Parse error: {} at {}", message, token.position);

        Self {
            message,
            position: token.position,
            token: token.clone(),
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token.kind == TokenKind::EOF {
            write!(f, "[{}] Error at end: {}", self.position, self.message)
        } else {
            write!(
                f,
                "[{}] Error at '{}': {}",
                self.position, self.token.literal, self.message
            )
        }
    }
}

/// Canonical error type used at the crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SprigError {
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Every syntax error found in one parse pass.
    #[error("{}", render_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error("{0}")]
    Runtime(Box<RuntimeError>),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<RuntimeError> for SprigError {
    fn from(err: RuntimeError) -> Self {
        SprigError::Runtime(Box::new(err))
    }
}

fn render_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SprigError>;
