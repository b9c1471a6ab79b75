//! Downloads product images for catalog entries that only have a URL.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::domain::catalog::{CatalogEntry, IMAGE_FAILURE_THRESHOLD};
use crate::domain::types::ImageUrl;
use crate::models::config::ImageBackfillConfig;
use crate::repository::{Checkpoint, ImageBackfillStore, RepositoryResult};

/// Largest payload accepted from a single download.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Why an image could not be obtained. Every variant counts as one failed
/// attempt for the entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("image exceeds {0} bytes")]
    TooLarge(u64),
    #[error("empty response body")]
    Empty,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Transport used to download image payloads.
pub trait ImageFetcher {
    fn fetch(&self, url: &ImageUrl, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher that never buffers more than the size cap.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
    max_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_max_bytes(MAX_IMAGE_BYTES)
    }

    pub fn with_max_bytes(max_bytes: u64) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client, max_bytes })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &ImageUrl, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.as_str()).timeout(timeout).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        let mut body = Vec::new();
        response
            .take(self.max_bytes + 1)
            .read_to_end(&mut body)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::TimedOut => FetchError::Timeout,
                _ => FetchError::Network(err.to_string()),
            })?;

        if body.len() as u64 > self.max_bytes {
            return Err(FetchError::TooLarge(self.max_bytes));
        }
        if body.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }
}

/// Limits of one backfill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Entries examined per run.
    pub limit: usize,
    pub timeout: Duration,
    /// Buffered download outcomes between commits. Zero is treated as one.
    pub commit_batch_size: usize,
}

impl From<&ImageBackfillConfig> for BackfillOptions {
    fn from(config: &ImageBackfillConfig) -> Self {
        Self {
            limit: config.limit,
            timeout: config.timeout(),
            commit_batch_size: config.commit_batch_size,
        }
    }
}

/// Counts of one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successes served from this run's cache or another entry's payload.
    pub reused: usize,
}

type Attempt = Result<Vec<u8>, FetchError>;

/// Download outcome waiting to be written.
struct PendingWrite {
    entry: CatalogEntry,
    attempt: Attempt,
    reused: bool,
}

/// Fills in missing image payloads.
///
/// Identical URLs are downloaded at most once per run, and not at all when
/// another entry already holds the payload. An entry whose download fails
/// [`IMAGE_FAILURE_THRESHOLD`] times is flagged and no longer selected.
///
/// Downloads never run inside a database transaction. Outcomes are buffered
/// and written in one short transaction per `commit_batch_size` outcomes,
/// plus once at the end, so a concurrent import only ever waits for a flush.
/// Single-entry write failures are logged and skipped; fatal storage errors
/// and failed checkpoints end the run with `Err`.
pub fn run_image_backfill<S, F>(
    store: &mut S,
    fetcher: &F,
    options: BackfillOptions,
) -> RepositoryResult<BackfillSummary>
where
    S: ImageBackfillStore + Checkpoint,
    F: ImageFetcher + ?Sized,
{
    let commit_batch_size = options.commit_batch_size.max(1);
    let candidates = store.list_image_candidates(options.limit)?;
    info!("Image backfill: {} candidate entries", candidates.len());

    let mut summary = BackfillSummary::default();
    let mut attempts: HashMap<String, Attempt> = HashMap::new();
    let mut pending: Vec<PendingWrite> = Vec::with_capacity(commit_batch_size);

    for entry in candidates {
        summary.processed += 1;
        let (attempt, reused) = resolve_image(store, fetcher, &entry, &mut attempts, options)?;
        pending.push(PendingWrite {
            entry,
            attempt,
            reused,
        });

        if pending.len() >= commit_batch_size {
            flush(store, &mut pending, &mut summary)?;
        }
    }

    if !pending.is_empty() {
        flush(store, &mut pending, &mut summary)?;
    }

    info!(
        "Image backfill finished: {} processed, {} downloaded ({} reused), {} failed",
        summary.processed, summary.succeeded, summary.reused, summary.failed
    );
    Ok(summary)
}

/// Writes buffered outcomes and commits them.
fn flush<S>(
    store: &mut S,
    pending: &mut Vec<PendingWrite>,
    summary: &mut BackfillSummary,
) -> RepositoryResult<()>
where
    S: ImageBackfillStore + Checkpoint,
{
    for PendingWrite {
        entry,
        attempt,
        reused,
    } in pending.drain(..)
    {
        let written = match attempt {
            Ok(bytes) => {
                let stored = store.store_image(entry.id, &bytes);
                if stored.is_ok() {
                    summary.succeeded += 1;
                    if reused {
                        summary.reused += 1;
                    }
                }
                stored
            }
            Err(err) => {
                summary.failed += 1;
                record_failure(store, &entry, &err)
            }
        };

        match written {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => warn!("Entry {} ({}): write failed: {err}", entry.id, entry.sku),
        }
    }
    store.checkpoint()
}

/// Returns the payload for an entry's URL and whether it was reused rather
/// than downloaded.
fn resolve_image<S, F>(
    store: &mut S,
    fetcher: &F,
    entry: &CatalogEntry,
    attempts: &mut HashMap<String, Attempt>,
    options: BackfillOptions,
) -> RepositoryResult<(Attempt, bool)>
where
    S: ImageBackfillStore,
    F: ImageFetcher + ?Sized,
{
    let raw = entry.image_url.as_deref().unwrap_or_default();
    let url = match ImageUrl::new(raw) {
        Ok(url) => url,
        Err(_) => return Ok((Err(FetchError::InvalidUrl(raw.to_string())), false)),
    };

    if let Some(previous) = attempts.get(url.as_str()) {
        debug!("Entry {}: reusing result for {url}", entry.id);
        return Ok((previous.clone(), previous.is_ok()));
    }

    match store.find_image_by_url(url.as_str(), entry.id) {
        Ok(Some(bytes)) => {
            debug!("Entry {}: copying payload stored for {url}", entry.id);
            attempts.insert(url.as_str().to_string(), Ok(bytes.clone()));
            return Ok((Ok(bytes), true));
        }
        Ok(None) => {}
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => warn!("Entry {}: payload lookup failed: {err}", entry.id),
    }

    let attempt = fetcher.fetch(&url, options.timeout);
    attempts.insert(url.as_str().to_string(), attempt.clone());
    Ok((attempt, false))
}

fn record_failure<S>(store: &mut S, entry: &CatalogEntry, err: &FetchError) -> RepositoryResult<()>
where
    S: ImageBackfillStore,
{
    let fail_count = entry.image_fail_count.incremented();
    let failed = fail_count.get() >= IMAGE_FAILURE_THRESHOLD;
    if failed {
        warn!(
            "Entry {} ({}): {err}; giving up after {fail_count} attempts",
            entry.id, entry.sku
        );
    } else {
        warn!(
            "Entry {} ({}): {err} (attempt {fail_count})",
            entry.id, entry.sku
        );
    }
    store.record_image_failure(entry.id, fail_count, failed)
}
