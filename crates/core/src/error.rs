//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// conflicts, missing records). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field is missing or a value is malformed for this kind of request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record (product, item, unit) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request contradicts current state (wrong source unit, insufficient stock).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested lifecycle transition is not defined for the record's status.
    #[error("unsupported transition: {0}")]
    UnsupportedTransition(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unsupported_transition(msg: impl Into<String>) -> Self {
        Self::UnsupportedTransition(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
