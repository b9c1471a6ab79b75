use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Errors raised by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No connection could be obtained from the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    /// Stored data did not satisfy domain constraints.
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("not found")]
    NotFound,
}

impl RepositoryError {
    /// Whether the error means the storage layer itself is unusable.
    ///
    /// Constraint violations, missing records and invalid data are scoped to
    /// the record being written. Anything else (connectivity, broken
    /// transactions, I/O) ends the current run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Pool(_) => true,
            Self::Database(DieselError::DatabaseError(kind, _)) => !matches!(
                kind,
                DatabaseErrorKind::UniqueViolation
                    | DatabaseErrorKind::ForeignKeyViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::CheckViolation
            ),
            Self::Database(DieselError::NotFound) => false,
            Self::Database(_) => true,
            Self::ValidationError(_) | Self::NotFound => false,
        }
    }
}

/// Convenient alias for repository results.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn database_error(kind: DatabaseErrorKind) -> RepositoryError {
        RepositoryError::Database(DieselError::DatabaseError(
            kind,
            Box::new("constraint failed".to_string()),
        ))
    }

    #[test]
    fn constraint_violations_are_not_fatal() {
        assert!(!database_error(DatabaseErrorKind::UniqueViolation).is_fatal());
        assert!(!database_error(DatabaseErrorKind::CheckViolation).is_fatal());
        assert!(!RepositoryError::ValidationError("bad".into()).is_fatal());
    }

    #[test]
    fn connectivity_errors_are_fatal() {
        assert!(database_error(DatabaseErrorKind::ClosedConnection).is_fatal());
        assert!(RepositoryError::Database(DieselError::BrokenTransactionManager).is_fatal());
    }
}
