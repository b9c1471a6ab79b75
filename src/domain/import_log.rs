use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{BatchName, ImportLogId, LocationId, RowCount};

/// Outcome summary of one spreadsheet import run.
///
/// Written once when the run ends and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchLog {
    pub id: ImportLogId,
    pub name: BatchName,
    pub platform: String,
    pub stock_location_id: Option<LocationId>,
    pub total: RowCount,
    pub success: RowCount,
    pub failed: RowCount,
    pub skipped: RowCount,
    /// Newline separated per-row messages.
    pub message: String,
    /// The uploaded spreadsheet, kept for audit.
    #[serde(skip)]
    pub import_file: Vec<u8>,
    pub created_at: NaiveDateTime,
}

impl ImportBatchLog {
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.message.lines().filter(|line| !line.is_empty())
    }
}

/// Data required to insert a new [`ImportBatchLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImportBatchLog {
    pub name: BatchName,
    pub platform: String,
    pub stock_location_id: Option<LocationId>,
    pub total: RowCount,
    pub success: RowCount,
    pub failed: RowCount,
    pub skipped: RowCount,
    pub message: String,
    #[serde(skip)]
    pub import_file: Vec<u8>,
}

impl NewImportBatchLog {
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.message.lines().filter(|line| !line.is_empty())
    }
}
