use crate::domain::import_log::ImportBatchLog;
use crate::domain::types::{ImportLogId, Sku};
use crate::forms::import::{ImportProductsPayload, parse_spreadsheet};
use crate::repository::{
    CatalogReader, CatalogWriter, Checkpoint, CustomsReader, CustomsWriter, ImageBackfillStore,
    ImportLogListQuery, ImportLogReader, ImportLogWriter,
};
use crate::services::importer::{self, ImportContext};

use super::{ServiceError, ServiceResult};

/// Imports an uploaded spreadsheet and persists the log of the run.
///
/// Unreadable files are rejected before any row is touched and leave no log.
/// When the run aborts on a storage error the uncommitted batch is discarded
/// before the log is written.
pub fn import_products<S>(
    payload: ImportProductsPayload,
    store: &mut S,
) -> ServiceResult<ImportBatchLog>
where
    S: CatalogReader
        + CatalogWriter
        + CustomsReader
        + CustomsWriter
        + ImportLogWriter
        + Checkpoint,
{
    let rows = parse_spreadsheet(&payload.file).map_err(|e| {
        log::error!("Failed to read '{}': {e}", payload.batch_name);
        ServiceError::from(e)
    })?;
    log::info!(
        "Importing {} rows from '{}' as {}",
        rows.len(),
        payload.batch_name,
        payload.platform
    );

    let context = ImportContext {
        batch_name: payload.batch_name,
        platform: payload.platform,
        default_location: payload.default_location,
        batch_size: payload.batch_size,
        file: payload.file,
    };
    let summary = importer::run(store, &rows, context);

    if summary.aborted {
        if let Err(e) = store.rollback() {
            log::error!("Failed to discard the aborted batch: {e}");
        }
    }

    let log = store.create_import_log(&summary.log).map_err(|e| {
        log::error!(
            "Failed to store import log ({} of {} rows imported): {e}",
            summary.log.success,
            summary.log.total
        );
        ServiceError::from(e)
    })?;
    store.checkpoint()?;

    Ok(log)
}

/// Import logs, newest first, optionally restricted to one platform.
pub fn show_import_logs<S>(
    platform: Option<&str>,
    store: &mut S,
) -> ServiceResult<Vec<ImportBatchLog>>
where
    S: ImportLogReader,
{
    let mut query = ImportLogListQuery::default();
    if let Some(platform) = platform {
        query = query.platform(platform.trim().to_ascii_lowercase());
    }

    match store.list_import_logs(query) {
        Ok((_total, logs)) => Ok(logs),
        Err(e) => {
            log::error!("Failed to list import logs: {e}");
            Err(ServiceError::from(e))
        }
    }
}

pub fn show_import_log<S>(log_id: i32, store: &mut S) -> ServiceResult<ImportBatchLog>
where
    S: ImportLogReader,
{
    let log_id = ImportLogId::new(log_id)?;

    match store.get_import_log_by_id(log_id) {
        Ok(Some(log)) => Ok(log),
        Ok(None) => Err(ServiceError::NotFound),
        Err(e) => {
            log::error!("Failed to get import log {log_id}: {e}");
            Err(ServiceError::from(e))
        }
    }
}

/// Clears the failure flag of an entry so the backfill picks it up again.
pub fn reset_image_failure<S>(sku: &str, store: &mut S) -> ServiceResult<()>
where
    S: ImageBackfillStore + Checkpoint,
{
    let sku = Sku::new(sku)?;

    match store.reset_image_failure(&sku) {
        Ok(0) => Err(ServiceError::NotFound),
        Ok(_) => {
            store.checkpoint()?;
            log::info!("Image download re-enabled for {sku}");
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to reset image state of {sku}: {e}");
            Err(ServiceError::from(e))
        }
    }
}
