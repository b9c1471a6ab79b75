//! Runs a whole spreadsheet through the reconciler with periodic commits.

use log::{error, info, warn};

use crate::domain::import_log::NewImportBatchLog;
use crate::domain::platform::columns_for;
use crate::domain::row::RawRow;
use crate::domain::types::{BatchName, LocationId, RowCount};
use crate::repository::{
    CatalogReader, CatalogWriter, Checkpoint, CustomsReader, CustomsWriter, RepositoryError,
};
use crate::services::reconcile::{RowOutcome, reconcile};

/// Prefix of the log line written when a run is aborted.
pub const CRITICAL_MARKER: &str = "CRITICAL:";

/// Parameters of one import run.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub batch_name: BatchName,
    pub platform: String,
    pub default_location: Option<LocationId>,
    /// Rows reconciled between checkpoints. Zero is treated as one.
    pub batch_size: usize,
    /// Uploaded bytes, kept on the log for audit.
    pub file: Vec<u8>,
}

/// Log of a run plus per-outcome tallies.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub log: NewImportBatchLog,
    pub created: usize,
    pub updated: usize,
    /// The run stopped on a fatal storage error.
    pub aborted: bool,
}

#[derive(Default)]
struct Tally {
    total: usize,
    created: usize,
    updated: usize,
    skipped: usize,
    messages: Vec<String>,
}

impl Tally {
    fn success(&self) -> usize {
        self.created + self.updated
    }

    fn push(&mut self, row_number: usize, sku: &str, reason: impl std::fmt::Display) {
        self.messages
            .push(format!("Row {row_number} (SKU: {sku}): {reason}"));
    }

    fn abort(&mut self, what: &str, err: &RepositoryError) {
        error!("Import aborted {what}: {err}");
        self.messages
            .push(format!("{CRITICAL_MARKER} import aborted {what}: {err}"));
    }

    fn finish(self, context: ImportContext, aborted: bool) -> ImportSummary {
        let success = self.success();
        let log = NewImportBatchLog {
            name: context.batch_name,
            platform: context.platform,
            stock_location_id: context.default_location,
            total: RowCount::from_usize(self.total),
            success: RowCount::from_usize(success),
            failed: RowCount::from_usize(self.total.saturating_sub(success)),
            skipped: RowCount::from_usize(self.skipped),
            message: self.messages.join("\n"),
            import_file: context.file,
        };
        ImportSummary {
            log,
            created: self.created,
            updated: self.updated,
            aborted,
        }
    }
}

/// Imports `rows` in file order and returns the log of the run.
///
/// Rows without a SKU are reported and never reconciled. A checkpoint is
/// taken after every `batch_size` rows and once more at the end. A fatal
/// storage error stops the run; rows not reached count as failed.
pub fn run<S>(store: &mut S, rows: &[RawRow], context: ImportContext) -> ImportSummary
where
    S: CatalogReader + CatalogWriter + CustomsReader + CustomsWriter + Checkpoint,
{
    let profile = columns_for(&context.platform);
    let batch_size = context.batch_size.max(1);
    let mut tally = Tally::default();

    let (candidates, without_sku): (Vec<&RawRow>, Vec<&RawRow>) = rows
        .iter()
        .partition(|row| !row.text(profile.columns.sku).is_empty());

    for row in &without_sku {
        tally.skipped += 1;
        tally.push(row.row_number, "", "SKU is empty");
    }
    tally.total = candidates.len();

    if candidates.is_empty() {
        info!(
            "Import '{}' ({}) has no rows with a SKU",
            context.batch_name, profile.tag
        );
        return tally.finish(context, false);
    }

    let mut since_checkpoint = 0;
    for row in candidates {
        let report = match reconcile(store, row, profile, context.default_location) {
            Ok(report) => report,
            Err(err) => {
                let sku = row.text(profile.columns.sku);
                tally.push(row.row_number, &sku, &err);
                tally.abort(&format!("at row {}", row.row_number), &err);
                return tally.finish(context, true);
            }
        };

        for warning in &report.warnings {
            warn!("Row {} (SKU: {}): {warning}", row.row_number, report.sku);
            tally.push(row.row_number, &report.sku, warning);
        }
        match &report.outcome {
            RowOutcome::Created => tally.created += 1,
            RowOutcome::Updated => tally.updated += 1,
            RowOutcome::Skipped(reason) | RowOutcome::Failed(reason) => {
                warn!("Row {} (SKU: {}): {reason}", row.row_number, report.sku);
                tally.push(row.row_number, &report.sku, reason);
            }
        }

        since_checkpoint += 1;
        if since_checkpoint == batch_size {
            if let Err(err) = store.checkpoint() {
                tally.abort(&format!("while committing at row {}", row.row_number), &err);
                return tally.finish(context, true);
            }
            since_checkpoint = 0;
        }
    }

    if since_checkpoint > 0 {
        if let Err(err) = store.checkpoint() {
            tally.abort("while committing the final batch", &err);
            return tally.finish(context, true);
        }
    }

    info!(
        "Import '{}' ({}): {} rows, {} created, {} updated, {} failed, {} without SKU",
        context.batch_name,
        profile.tag,
        tally.total,
        tally.created,
        tally.updated,
        tally.total - tally.success(),
        tally.skipped
    );
    tally.finish(context, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::CellValue;
    use crate::domain::types::CostPrice;
    use crate::repository::test::TestRepository;

    fn context(batch_size: usize) -> ImportContext {
        ImportContext {
            batch_name: BatchName::new("batch.xlsx").unwrap(),
            platform: "default".to_string(),
            default_location: None,
            batch_size,
            file: vec![0xAA],
        }
    }

    fn row(row_number: usize, sku: &str, cost: &str) -> RawRow {
        let mut cells = vec![CellValue::Empty; 9];
        cells[0] = sku.into();
        cells[3] = format!("Product {sku}").into();
        cells[8] = cost.into();
        RawRow::new(row_number, cells)
    }

    fn rows(count: usize) -> Vec<RawRow> {
        (1..=count)
            .map(|n| row(n + 1, &format!("SKU-{n}"), "1.5"))
            .collect()
    }

    #[test]
    fn rows_without_sku_are_skipped_and_not_counted() {
        let mut repo = TestRepository::default();
        let input = vec![row(2, "SKU-1", "1"), row(3, "", "1"), row(4, "SKU-2", "1")];

        let summary = run(&mut repo, &input, context(50));

        assert_eq!(summary.log.total, 2);
        assert_eq!(summary.log.success, 2);
        assert_eq!(summary.log.failed, 0);
        assert_eq!(summary.log.skipped, 1);
        assert_eq!(
            summary.log.messages().collect::<Vec<_>>(),
            vec!["Row 3 (SKU: ): SKU is empty"]
        );
        assert_eq!(repo.looked_up, vec!["SKU-1", "SKU-2"]);
    }

    #[test]
    fn importing_twice_creates_nothing_new() {
        let mut repo = TestRepository::default();
        let input = rows(5);

        let first = run(&mut repo, &input, context(2));
        let state: Vec<_> = repo
            .entries
            .iter()
            .map(|e| (e.sku.clone(), e.name.clone(), e.cost_price))
            .collect();
        let second = run(&mut repo, &input, context(2));

        assert_eq!(first.created, 5);
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 5);
        let after: Vec<_> = repo
            .entries
            .iter()
            .map(|e| (e.sku.clone(), e.name.clone(), e.cost_price))
            .collect();
        assert_eq!(state, after);
    }

    #[test]
    fn non_numeric_cost_is_a_warning_not_a_failure() {
        let mut existing = TestRepository::entry(1, "SKU-1", None);
        existing.cost_price = CostPrice::new(4.0).unwrap();
        let mut repo = TestRepository::new(vec![existing]);

        let summary = run(&mut repo, &[row(2, "SKU-1", "cheap")], context(50));

        assert_eq!(summary.log.success, 1);
        assert_eq!(summary.log.failed, 0);
        assert_eq!(repo.by_sku("SKU-1").unwrap().cost_price, 4.0);
        let messages: Vec<_> = summary.log.messages().collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Row 2 (SKU: SKU-1): cost price is not a number"));
    }

    #[test]
    fn checkpoints_after_each_batch_and_at_the_end() {
        let mut repo = TestRepository::default();

        run(&mut repo, &rows(25), context(10));

        assert_eq!(repo.checkpoints, 3);
        assert_eq!(repo.pending_writes, 0);
    }

    #[test]
    fn no_final_checkpoint_when_last_batch_is_full() {
        let mut repo = TestRepository::default();

        run(&mut repo, &rows(20), context(10));

        assert_eq!(repo.checkpoint_calls, 2);
    }

    #[test]
    fn fatal_error_stops_the_run() {
        let mut repo = TestRepository {
            fatal_on_sku: Some("SKU-37".into()),
            ..TestRepository::default()
        };

        let summary = run(&mut repo, &rows(100), context(10));

        assert!(summary.aborted);
        assert_eq!(summary.log.total, 100);
        assert_eq!(summary.log.success, 36);
        assert_eq!(summary.log.failed, 64);
        assert_eq!(repo.looked_up.len(), 37);
        assert!(!repo.looked_up.iter().any(|sku| sku == "SKU-38"));
        assert!(
            summary
                .log
                .messages()
                .last()
                .is_some_and(|line| line.starts_with(CRITICAL_MARKER))
        );
        assert_eq!(repo.checkpoints, 3);
    }

    #[test]
    fn failed_checkpoint_stops_the_run() {
        let mut repo = TestRepository {
            fail_checkpoint_number: Some(2),
            ..TestRepository::default()
        };

        let summary = run(&mut repo, &rows(30), context(10));

        assert!(summary.aborted);
        assert_eq!(repo.looked_up.len(), 20);
        assert_eq!(summary.log.success, 20);
        assert_eq!(summary.log.failed, 10);
        assert!(
            summary
                .log
                .messages()
                .any(|line| line.contains("while committing at row 21"))
        );
    }

    #[test]
    fn failed_rows_count_against_success() {
        let mut repo = TestRepository {
            reject_create_for_sku: Some("SKU-2".into()),
            ..TestRepository::default()
        };

        let summary = run(&mut repo, &rows(3), context(50));

        assert!(!summary.aborted);
        assert_eq!(summary.log.success, 2);
        assert_eq!(summary.log.failed, 1);
        assert!(
            summary
                .log
                .messages()
                .any(|line| line.starts_with("Row 3 (SKU: SKU-2): database error"))
        );
    }

    #[test]
    fn no_rows_with_sku_touches_nothing() {
        let mut repo = TestRepository::default();

        let summary = run(&mut repo, &[row(2, "", "1")], context(50));

        assert_eq!(summary.log.total, 0);
        assert_eq!(summary.log.success, 0);
        assert_eq!(summary.log.skipped, 1);
        assert_eq!(repo.checkpoint_calls, 0);
        assert!(repo.looked_up.is_empty());
        assert_eq!(summary.log.import_file, vec![0xAA]);
    }
}
