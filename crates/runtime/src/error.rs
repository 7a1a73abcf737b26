use thiserror::Error;

use plantcare_audit::{AuditError, ValidationError};
use plantcare_core::RecordId;
use plantcare_store::PersistenceError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected input; the message is meant for the user.
    #[error("{0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: RecordId },

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AuditError> for ServiceError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Validation(err) => err.into(),
            AuditError::Persistence(err) => err.into(),
        }
    }
}
