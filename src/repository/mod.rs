use std::collections::HashMap;

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::sqlite::SqliteConnection;

use crate::db::{DbConnection, DbPool};
use crate::domain::catalog::{CatalogEntry, CatalogEntryChanges, NewCatalogEntry};
use crate::domain::customs::{CustomsMetadata, NewCustomsMetadata};
use crate::domain::import_log::{ImportBatchLog, NewImportBatchLog};
use crate::domain::types::{CustomsId, EntryId, FailCount, ImportLogId, Sku};

pub use errors::{RepositoryError, RepositoryResult};

pub mod catalog;
pub mod customs;
pub mod errors;
pub mod images;
pub mod import_log;

/// Repository implementation backed by Diesel and SQLite.
///
/// The underlying `r2d2::Pool` is cheap to clone. Work happens inside a
/// [`DieselSession`] obtained from [`DieselRepository::session`].
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Create a new repository from an established database pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open a transactional session on a pooled connection.
    pub fn session(&self) -> RepositoryResult<DieselSession> {
        Ok(DieselSession::new(self.pool.get()?))
    }
}

/// Transactional context shared by the importer and the backfill worker.
///
/// A transaction is opened lazily by the first operation and stays open until
/// [`Checkpoint::checkpoint`] commits it. Dropping a session with an open
/// transaction rolls the uncommitted work back.
pub struct DieselSession {
    conn: DbConnection,
    in_transaction: bool,
    /// Entries looked up or written since the last checkpoint, keyed by SKU.
    cache: HashMap<String, CatalogEntry>,
}

impl DieselSession {
    fn new(conn: DbConnection) -> Self {
        Self {
            conn,
            in_transaction: false,
            cache: HashMap::new(),
        }
    }

    /// Connection with the session transaction opened.
    fn conn(&mut self) -> RepositoryResult<&mut SqliteConnection> {
        if !self.in_transaction {
            <AnsiTransactionManager as TransactionManager<SqliteConnection>>::begin_transaction(
                &mut self.conn,
            )?;
            self.in_transaction = true;
        }
        Ok(&mut *self.conn)
    }

    /// Connection without opening the session transaction. Outside a
    /// transaction each statement runs on its own and holds no lock
    /// afterwards.
    fn read_conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Number of entries currently held in the session cache.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl Drop for DieselSession {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Err(e) =
                <AnsiTransactionManager as TransactionManager<SqliteConnection>>::rollback_transaction(
                    &mut self.conn,
                )
            {
                log::warn!("Failed to roll back uncommitted session work: {e}");
            }
        }
    }
}

impl Checkpoint for DieselSession {
    fn checkpoint(&mut self) -> RepositoryResult<()> {
        if self.in_transaction {
            <AnsiTransactionManager as TransactionManager<SqliteConnection>>::commit_transaction(
                &mut self.conn,
            )?;
            self.in_transaction = false;
        }
        self.cache.clear();
        Ok(())
    }

    fn rollback(&mut self) -> RepositoryResult<()> {
        self.cache.clear();
        if self.in_transaction {
            self.in_transaction = false;
            <AnsiTransactionManager as TransactionManager<SqliteConnection>>::rollback_transaction(
                &mut self.conn,
            )?;
        }
        Ok(())
    }
}

/// Page selection for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

/// Query parameters for listing import logs, newest first.
#[derive(Debug, Clone, Default)]
pub struct ImportLogListQuery {
    /// Restrict to logs of one platform tag.
    pub platform: Option<String>,
    /// Pagination parameters.
    pub pagination: Option<Pagination>,
}

impl ImportLogListQuery {
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

/// Durability boundary of a transactional context.
pub trait Checkpoint {
    /// Commit all pending changes and drop cached objects.
    fn checkpoint(&mut self) -> RepositoryResult<()>;
    /// Discard everything written since the last checkpoint.
    fn rollback(&mut self) -> RepositoryResult<()>;
}

/// Read-only operations for catalog entries.
pub trait CatalogReader {
    /// Find the entry owning `sku`.
    fn find_by_sku(&mut self, sku: &Sku) -> RepositoryResult<Option<CatalogEntry>>;
    /// Retrieve an entry by its identifier.
    fn get_entry_by_id(&mut self, id: EntryId) -> RepositoryResult<Option<CatalogEntry>>;
}

/// Write operations for catalog entries.
pub trait CatalogWriter {
    /// Persist a new entry.
    fn create_entry(&mut self, entry: &NewCatalogEntry) -> RepositoryResult<CatalogEntry>;
    /// Apply a partial update and return the updated entry.
    fn update_entry(
        &mut self,
        id: EntryId,
        changes: &CatalogEntryChanges,
    ) -> RepositoryResult<CatalogEntry>;
}

/// Read-only operations for customs metadata.
pub trait CustomsReader {
    /// Find the metadata record owned by an entry.
    fn find_customs_by_entry(
        &mut self,
        entry_id: EntryId,
    ) -> RepositoryResult<Option<CustomsMetadata>>;
}

/// Write operations for customs metadata.
pub trait CustomsWriter {
    fn create_customs(&mut self, metadata: &NewCustomsMetadata)
    -> RepositoryResult<CustomsMetadata>;
    /// Overwrite every field of an existing record.
    fn update_customs(
        &mut self,
        id: CustomsId,
        metadata: &NewCustomsMetadata,
    ) -> RepositoryResult<CustomsMetadata>;
}

/// Read-only operations for import logs.
pub trait ImportLogReader {
    fn list_import_logs(
        &mut self,
        query: ImportLogListQuery,
    ) -> RepositoryResult<(usize, Vec<ImportBatchLog>)>;
    fn get_import_log_by_id(&mut self, id: ImportLogId)
    -> RepositoryResult<Option<ImportBatchLog>>;
}

/// Write operations for import logs. Logs are never updated.
pub trait ImportLogWriter {
    fn create_import_log(&mut self, log: &NewImportBatchLog) -> RepositoryResult<ImportBatchLog>;
}

/// Storage operations used by the image backfill worker.
///
/// Single-entry writes are isolated: a failed write leaves no partial change
/// behind and does not affect other pending work.
pub trait ImageBackfillStore {
    /// Entries with a pending image URL, ordered by id, at most `limit`.
    fn list_image_candidates(&mut self, limit: usize) -> RepositoryResult<Vec<CatalogEntry>>;
    /// Payload already downloaded by another entry for the identical URL.
    fn find_image_by_url(
        &mut self,
        url: &str,
        exclude: EntryId,
    ) -> RepositoryResult<Option<Vec<u8>>>;
    /// Store a payload and clear failure bookkeeping.
    fn store_image(&mut self, id: EntryId, image: &[u8]) -> RepositoryResult<()>;
    /// Record a failed attempt.
    fn record_image_failure(
        &mut self,
        id: EntryId,
        fail_count: FailCount,
        failed: bool,
    ) -> RepositoryResult<()>;
    /// Re-admit an entry to backfill selection. Returns affected rows.
    fn reset_image_failure(&mut self, sku: &Sku) -> RepositoryResult<usize>;
}
