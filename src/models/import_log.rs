use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::import_log::{
    ImportBatchLog as DomainImportBatchLog, NewImportBatchLog as DomainNewImportBatchLog,
};
use crate::domain::types::{BatchName, LocationId, RowCount, TypeConstraintError};

/// Diesel model representing the `import_batch_logs` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::import_batch_logs)]
pub struct ImportBatchLog {
    pub id: i32,
    pub name: String,
    pub platform: String,
    pub stock_location_id: Option<i32>,
    pub total: i32,
    pub success: i32,
    pub failed: i32,
    pub skipped: i32,
    pub message: String,
    pub import_file: Vec<u8>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::import_batch_logs)]
pub struct NewImportBatchLog<'a> {
    pub name: &'a str,
    pub platform: &'a str,
    pub stock_location_id: Option<i32>,
    pub total: i32,
    pub success: i32,
    pub failed: i32,
    pub skipped: i32,
    pub message: &'a str,
    pub import_file: &'a [u8],
    pub created_at: NaiveDateTime,
}

impl TryFrom<ImportBatchLog> for DomainImportBatchLog {
    type Error = TypeConstraintError;

    fn try_from(log: ImportBatchLog) -> Result<Self, Self::Error> {
        Ok(Self {
            id: log.id.try_into()?,
            name: BatchName::new(log.name)?,
            platform: log.platform,
            stock_location_id: log.stock_location_id.map(LocationId::new).transpose()?,
            total: RowCount::new(log.total)?,
            success: RowCount::new(log.success)?,
            failed: RowCount::new(log.failed)?,
            skipped: RowCount::new(log.skipped)?,
            message: log.message,
            import_file: log.import_file,
            created_at: log.created_at,
        })
    }
}

impl<'a> NewImportBatchLog<'a> {
    pub fn from_domain(log: &'a DomainNewImportBatchLog, now: NaiveDateTime) -> Self {
        Self {
            name: log.name.as_str(),
            platform: &log.platform,
            stock_location_id: log.stock_location_id.map(LocationId::get),
            total: log.total.get(),
            success: log.success.get(),
            failed: log.failed.get(),
            skipped: log.skipped.get(),
            message: &log.message,
            import_file: &log.import_file,
            created_at: now,
        }
    }
}
