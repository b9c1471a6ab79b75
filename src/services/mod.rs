pub use errors::{ServiceError, ServiceResult};

pub mod errors;
pub mod images;
pub mod import;
pub mod importer;
pub mod reconcile;
