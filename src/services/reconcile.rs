//! Applies one spreadsheet row to the catalog.

use thiserror::Error;

use crate::domain::catalog::{CatalogEntry, CatalogEntryChanges, NewCatalogEntry};
use crate::domain::customs::{CustomsMetadata, NewCustomsMetadata};
use crate::domain::platform::{ColumnMapping, PlatformProfile};
use crate::domain::row::RawRow;
use crate::domain::types::{
    CostPrice, DeclaredPrice, ImageUrl, LocationId, Sku, TypeConstraintError, Weight,
};
use crate::repository::{
    CatalogReader, CatalogWriter, CustomsReader, CustomsWriter, RepositoryError, RepositoryResult,
};

/// What happened to a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped(String),
    Failed(String),
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

/// Outcome of a row together with field-level warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    /// SKU as read from the row, possibly empty.
    pub sku: String,
    pub outcome: RowOutcome,
    pub warnings: Vec<String>,
}

/// Row-scoped failure. Storage errors that are not fatal end up here too.
#[derive(Debug, Error)]
enum RowError {
    #[error("{0}")]
    Storage(#[from] RepositoryError),
    #[error("{0}")]
    Invalid(#[from] TypeConstraintError),
}

/// Creates or updates the catalog entry described by `row`.
///
/// Returns `Err` only for fatal storage errors; everything scoped to the row
/// is reported through [`RowOutcome::Failed`] or a warning.
pub fn reconcile<S>(
    store: &mut S,
    row: &RawRow,
    profile: &PlatformProfile,
    default_location: Option<LocationId>,
) -> RepositoryResult<RowReport>
where
    S: CatalogReader + CatalogWriter + CustomsReader + CustomsWriter,
{
    let sku_text = row.text(profile.columns.sku);
    let Ok(sku) = Sku::new(sku_text.as_str()) else {
        return Ok(RowReport {
            sku: sku_text,
            outcome: RowOutcome::Skipped("SKU is empty".to_string()),
            warnings: Vec::new(),
        });
    };

    let mut warnings = Vec::new();
    let outcome = match apply_row(store, row, profile, &sku, default_location, &mut warnings) {
        Ok(outcome) => outcome,
        Err(RowError::Storage(err)) if err.is_fatal() => return Err(err),
        Err(err) => RowOutcome::Failed(err.to_string()),
    };

    Ok(RowReport {
        sku: sku.into_inner(),
        outcome,
        warnings,
    })
}

fn apply_row<S>(
    store: &mut S,
    row: &RawRow,
    profile: &PlatformProfile,
    sku: &Sku,
    default_location: Option<LocationId>,
    warnings: &mut Vec<String>,
) -> Result<RowOutcome, RowError>
where
    S: CatalogReader + CatalogWriter + CustomsReader + CustomsWriter,
{
    let columns = &profile.columns;
    let name = profile.naming.display_name(
        &row.text(columns.name_en),
        &row.text(columns.name_cn),
        sku,
    )?;
    let image_url = read_image_url(row, columns.image_url, warnings);
    let weight = read_amount(row, columns.weight, Weight::parse, warnings);
    let cost_price = read_amount(row, columns.cost, CostPrice::parse, warnings);

    let (entry, outcome) = match store.find_by_sku(sku)? {
        None => {
            let mut new_entry = NewCatalogEntry::new(sku.clone(), name);
            new_entry.stock_location_id = default_location;
            new_entry.image_url = image_url;
            new_entry.weight = weight.unwrap_or_default();
            new_entry.cost_price = cost_price.unwrap_or_default();
            (store.create_entry(&new_entry)?, RowOutcome::Created)
        }
        Some(existing) => {
            let changes = CatalogEntryChanges {
                name: (existing.name != name).then_some(name),
                weight: weight.filter(|value| *value != existing.weight),
                cost_price: cost_price.filter(|value| *value != existing.cost_price),
                stock_location_id: default_location
                    .filter(|location| existing.stock_location_id != Some(*location)),
                image_url: image_url
                    .filter(|url| existing.image_url.as_deref() != Some(url.as_str())),
            };
            let entry = if changes.is_empty() {
                existing
            } else {
                store.update_entry(existing.id, &changes)?
            };
            (entry, RowOutcome::Updated)
        }
    };

    upsert_customs(store, row, columns, &entry, warnings)?;
    Ok(outcome)
}

fn read_image_url(row: &RawRow, column: usize, warnings: &mut Vec<String>) -> Option<ImageUrl> {
    let raw = row.text(column);
    if raw.is_empty() {
        return None;
    }
    match ImageUrl::new(raw.as_str()) {
        Ok(url) => Some(url),
        Err(err) => {
            warnings.push(format!("{err}: '{raw}', image url not changed"));
            None
        }
    }
}

/// Empty cells and unreadable values both yield `None`; the latter also leave
/// a warning.
fn read_amount<T>(
    row: &RawRow,
    column: usize,
    parse: fn(&str) -> Result<T, TypeConstraintError>,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let raw = row.text(column);
    if raw.is_empty() {
        return None;
    }
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warnings.push(format!("{err}, previous value kept"));
            None
        }
    }
}

fn optional_text(row: &RawRow, column: usize) -> Option<String> {
    Some(row.text(column)).filter(|text| !text.is_empty())
}

fn upsert_customs<S>(
    store: &mut S,
    row: &RawRow,
    columns: &ColumnMapping,
    entry: &CatalogEntry,
    warnings: &mut Vec<String>,
) -> RepositoryResult<()>
where
    S: CustomsReader + CustomsWriter,
{
    let declared_price = match row.text(columns.declared_price) {
        raw if raw.is_empty() => DeclaredPrice::default(),
        raw => DeclaredPrice::parse(&raw).unwrap_or_else(|err| {
            warnings.push(format!("{err}, declared price set to 0"));
            DeclaredPrice::default()
        }),
    };

    let metadata = NewCustomsMetadata {
        entry_id: entry.id,
        source_url: optional_text(row, columns.declared_url),
        declared_name_en: optional_text(row, columns.declared_name_en),
        declared_name_cn: optional_text(row, columns.declared_name_cn),
        declared_price,
    };

    match store.find_customs_by_entry(entry.id)? {
        None => {
            store.create_customs(&metadata)?;
        }
        Some(existing) if !same_customs(&existing, &metadata) => {
            store.update_customs(existing.id, &metadata)?;
        }
        Some(_) => {}
    }
    Ok(())
}

fn same_customs(existing: &CustomsMetadata, metadata: &NewCustomsMetadata) -> bool {
    existing.source_url == metadata.source_url
        && existing.declared_name_en == metadata.declared_name_en
        && existing.declared_name_cn == metadata.declared_name_cn
        && existing.declared_price == metadata.declared_price
}
