//! Domain entities and value types for the product import pipeline.

pub mod catalog;
pub mod customs;
pub mod import_log;
pub mod platform;
pub mod row;
pub mod types;
