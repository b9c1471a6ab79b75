//! Helpers for integration tests.
#![allow(dead_code)]

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use product_import::db::{DbPool, establish_connection_pool};
use rust_xlsxwriter::Workbook;
use tempfile::NamedTempFile;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!(); // assumes migrations/ exists

/// Temporary database used in integration tests.
pub struct TestDb {
    _tempfile: NamedTempFile,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let tempfile = NamedTempFile::new().expect("Failed to create temp file");
        let pool = establish_connection_pool(tempfile.path().to_str().unwrap())
            .expect("Failed to establish SQLite connection.");
        let mut conn = pool
            .get()
            .expect("Failed to get SQLite connection from pool.");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Migrations failed");
        TestDb {
            _tempfile: tempfile,
            pool,
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

/// Builds an XLSX workbook with a header row followed by `rows`.
///
/// Cells are given as `(column, text)` pairs.
pub fn workbook(rows: &[Vec<(u16, &str)>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "header").expect("header cell");
    for (idx, cells) in rows.iter().enumerate() {
        let row = idx as u32 + 1;
        for (column, text) in cells {
            sheet.write_string(row, *column, *text).expect("data cell");
        }
    }
    workbook.save_to_buffer().expect("workbook bytes")
}
