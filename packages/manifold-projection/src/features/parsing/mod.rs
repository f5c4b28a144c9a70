//! Parsing Feature
//!
//! Turns producer output into `Declaration`s.
//!
//! ## Structure
//! - `infrastructure/` - tree-sitter-java walker, default-value pre-scan

pub mod infrastructure;

use thiserror::Error;

pub use infrastructure::{DeclarationParser, ParsedUnit, SpanExt};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("Failed to load grammar: {0}")]
    Language(String),

    #[error("Parser produced no tree")]
    NoTree,

    #[error("Source declares no types")]
    NoTypes,
}
