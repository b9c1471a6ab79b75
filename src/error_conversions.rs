//! Error conversion glue between layers.
//!
//! The domain layer must not depend on service/repository error types, so the
//! conversions live here.

use crate::domain::types::TypeConstraintError;
use crate::repository::RepositoryError;

impl From<TypeConstraintError> for RepositoryError {
    fn from(val: TypeConstraintError) -> Self {
        RepositoryError::ValidationError(val.to_string())
    }
}

#[cfg(feature = "worker")]
mod worker {
    use crate::domain::types::TypeConstraintError;
    use crate::forms::import::UploadParseError;
    use crate::services::ServiceError;

    impl From<TypeConstraintError> for ServiceError {
        fn from(val: TypeConstraintError) -> Self {
            ServiceError::TypeConstraint(val.to_string())
        }
    }

    impl From<UploadParseError> for ServiceError {
        fn from(val: UploadParseError) -> Self {
            ServiceError::UnreadableFile(val.to_string())
        }
    }

    impl From<validator::ValidationErrors> for ServiceError {
        fn from(val: validator::ValidationErrors) -> Self {
            ServiceError::Form(val.to_string())
        }
    }
}
