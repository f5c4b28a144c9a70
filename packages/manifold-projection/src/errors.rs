//! Error types for manifold-projection
//!
//! Only infrastructure failures surface as errors. Conflicts, malformed
//! producer output and synthesis violations are modeled as values
//! (error declarations, absent projections, diagnostics).

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::parsing::ParseError;
use crate::features::source_producer::ProduceError;

/// Main error type for manifold-projection operations
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Producer output could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Producer failed to supply source text
    #[error("Producer error: {0}")]
    Produce(#[from] ProduceError),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// File watcher failure
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Unknown module id
    #[error("Unknown module: {0}")]
    UnknownModule(String),
}

impl ProjectionError {
    /// Create a watcher error
    pub fn watcher(msg: impl Into<String>) -> Self {
        ProjectionError::Watcher(msg.into())
    }

    /// Create an unknown-module error
    pub fn unknown_module(id: impl std::fmt::Display) -> Self {
        ProjectionError::UnknownModule(id.to_string())
    }
}

impl From<notify::Error> for ProjectionError {
    fn from(err: notify::Error) -> Self {
        ProjectionError::Watcher(err.to_string())
    }
}

/// Result type alias for projection operations
pub type Result<T> = std::result::Result<T, ProjectionError>;
