//! Configuration text parser.
//!
//! The language is block-structured: a body holds `name = expression`
//! assignments and nested `type "label" { ... }` blocks. Expressions are
//! literals (strings, numbers, `true`, `false`, `null`), lists, objects,
//! variable traversals (`vars.items[0]`) and function calls. Comments start
//! with `#` or `//`, or are enclosed in `/* */`.
//!
//! Lexical errors are all reported together; the parser stops at the first
//! grammar error. Either way the caller gets [`Diagnostics`] and never a
//! partially parsed body.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::syntax;
//!
//! let source = r#"
//! title = "Weekly report"
//!
//! section "summary" {
//!   columns = ["name", "total"]
//! }
//! "#;
//! let body = syntax::parse(source, "report.conf").unwrap();
//! assert_eq!(body.attributes[0].name, "title");
//! assert_eq!(body.blocks[0].labels, vec!["summary".to_string()]);
//!
//! let err = syntax::parse("title = \n", "report.conf").unwrap_err();
//! assert!(err.has_errors());
//! ```

mod lexer;
mod parser;

use thiserror::Error;
use tracing::debug;

use crate::body::Body;
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};

use lexer::Lexer;
use parser::Parser;

/// Lexical or grammar error in configuration text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("character {found:?} is not valid here")]
    InvalidCharacter { found: char, range: SourceRange },

    #[error("string literal is missing its closing quote")]
    UnterminatedString { range: SourceRange },

    #[error("block comment is missing its closing `*/`")]
    UnterminatedComment { range: SourceRange },

    #[error("{sequence:?} is not a valid escape sequence")]
    InvalidEscape { sequence: String, range: SourceRange },

    #[error("{text:?} is not a valid number")]
    InvalidNumber { text: String, range: SourceRange },

    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: String,
        found: String,
        range: SourceRange,
    },
}

impl SyntaxError {
    /// Location of the offending text.
    pub fn range(&self) -> &SourceRange {
        match self {
            Self::InvalidCharacter { range, .. }
            | Self::UnterminatedString { range }
            | Self::UnterminatedComment { range }
            | Self::InvalidEscape { range, .. }
            | Self::InvalidNumber { range, .. }
            | Self::Unexpected { range, .. } => range,
        }
    }

    /// Short diagnostic summary.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::InvalidCharacter { .. } => "Invalid character",
            Self::UnterminatedString { .. } => "Unterminated string literal",
            Self::UnterminatedComment { .. } => "Unterminated comment",
            Self::InvalidEscape { .. } => "Invalid escape sequence",
            Self::InvalidNumber { .. } => "Invalid number literal",
            Self::Unexpected { .. } => "Syntax error",
        }
    }
}

impl From<SyntaxError> for Diagnostic {
    fn from(err: SyntaxError) -> Self {
        Diagnostic::error(err.summary(), err.to_string()).with_range(err.range().clone())
    }
}

/// Parses configuration text into a [`Body`].
///
/// # Errors
///
/// Returns every lexical error, or the first grammar error, as diagnostics.
pub fn parse(source: &str, filename: &str) -> Result<Body, Diagnostics> {
    let (tokens, errors) = Lexer::new(source, filename).tokenize();
    if !errors.is_empty() {
        debug!(filename, errors = errors.len(), "lexing failed");
        return Err(errors.into_iter().map(Diagnostic::from).collect());
    }
    let body = Parser::new(&tokens)
        .parse_file()
        .map_err(|err| Diagnostics::from(Diagnostic::from(err)))?;
    debug!(
        filename,
        attributes = body.attributes.len(),
        blocks = body.blocks.len(),
        "parsed configuration"
    );
    Ok(body)
}
