use thiserror::Error;

use patrimonio_core::DomainError;

use crate::store::StoreError;

/// Error returned by the application services (movements, catalog, audit).
///
/// Domain rejections and store constraint failures collapse onto the same
/// categories so the calling layer maps them uniformly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unsupported transition: {0}")]
    UnsupportedTransition(String),

    /// Persisting or loading failed for reasons unrelated to the request.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::UnsupportedTransition(msg) => ServiceError::UnsupportedTransition(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Backend(_) => ServiceError::Store(value),
        }
    }
}

/// Failure of [`crate::processor::MovementProcessor::process`].
pub type MovementError = ServiceError;
