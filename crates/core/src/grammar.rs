//! The host-supplied single-statement grammar.
//!
//! The compiler never interprets a command itself. It hands raw statement
//! text to a [`CommandGrammar`] and wraps whatever opaque action comes back.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured syntax error reported by a host grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the statement text where parsing stopped.
    pub cursor: Option<usize>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cursor: None,
        }
    }

    pub fn at(message: impl Into<String>, cursor: usize) -> Self {
        Self {
            message: message.into(),
            cursor: Some(cursor),
        }
    }
}

/// Which iteration construct a selector header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorKind {
    Run,
    Loop,
}

impl SelectorKind {
    pub fn keyword(self) -> &'static str {
        match self {
            SelectorKind::Run => "run",
            SelectorKind::Loop => "loop",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Parses, validates and flattens one statement into a bound action.
pub trait CommandGrammar {
    /// Opaque executable unit bound from one statement.
    type Action: Clone + fmt::Debug + 'static;

    /// Parse an ordinary command line.
    fn parse_command(&self, text: &str) -> Result<Self::Action, SyntaxError>;

    /// Parse the selector part of a `run`/`loop` header.
    ///
    /// The returned action, when executed under the VM's control-flow source,
    /// appends every matching execution context to the topmost pending list
    /// instead of performing a visible effect.
    fn parse_selector(&self, kind: SelectorKind, text: &str) -> Result<Self::Action, SyntaxError>;
}

impl<G: CommandGrammar + ?Sized> CommandGrammar for &G {
    type Action = G::Action;

    fn parse_command(&self, text: &str) -> Result<Self::Action, SyntaxError> {
        (**self).parse_command(text)
    }

    fn parse_selector(
        &self,
        kind: SelectorKind,
        text: &str,
    ) -> Result<Self::Action, SyntaxError> {
        (**self).parse_selector(kind, text)
    }
}
