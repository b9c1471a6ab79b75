//! Core library exports for the product import service.
//!
//! This crate reads marketplace product spreadsheets into a SQLite catalog,
//! records an audit log per import and backfills product images from their
//! remote URLs. The `data` feature exposes the domain types, models and
//! repositories on their own; `worker` adds the spreadsheet reader, the
//! services and the command-line binary.

pub mod db;
pub mod domain;
#[cfg(feature = "worker")]
pub mod forms;
pub mod models;
pub mod repository;
pub mod schema;
#[cfg(feature = "worker")]
pub mod services;

mod error_conversions;
