//! Domain error model.

use thiserror::Error;

/// Domain-level error: a directory value that cannot be turned into a
/// domain primitive. Transport concerns belong to the directory adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
