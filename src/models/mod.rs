//! Diesel row types and their conversions into domain entities.

pub mod catalog;
#[cfg(feature = "worker")]
pub mod config;
pub mod customs;
pub mod import_log;
