use ingest_core::contract::ValidationError;

/// Failure taxonomy shared by every adapter and handler.
///
/// `NotFound` drives create paths and `AlreadyExists` is the expected
/// outcome of a racing create; neither is an error to the reconcilers.
/// `VersionConflict` propagates without an in-process retry: idempotent
/// re-invocation is the recovery path.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("version conflict: {0}")]
    VersionConflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("service call failed: {0}")]
    Service(String),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.message().to_string())
    }
}
