use thiserror::Error;

use crate::repository::RepositoryError;

/// Generic error type used by service layer functions.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was rejected before any work was done.
    #[error("invalid request: {0}")]
    Form(String),
    /// A value violated a domain constraint.
    #[error("{0}")]
    TypeConstraint(String),
    /// The uploaded file could not be read as a spreadsheet. No log is written.
    #[error("failed to read spreadsheet: {0}")]
    UnreadableFile(String),
    /// Requested resource was not found.
    #[error("not found")]
    NotFound,
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Convenient alias for results returned from service functions.
pub type ServiceResult<T> = Result<T, ServiceError>;
