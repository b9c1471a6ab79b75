use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::catalog::{
    CatalogEntry as DomainCatalogEntry, NewCatalogEntry as DomainNewCatalogEntry,
};
use crate::domain::types::{
    CostPrice, EntryName, FailCount, LocationId, Sku, TypeConstraintError, Weight,
};

/// Diesel model representing a row in the `catalog_entries` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::catalog_entries)]
pub struct CatalogEntry {
    pub id: i32,
    pub sku: String,
    pub name: String,
    pub weight: f64,
    pub cost_price: f64,
    pub stock_location_id: Option<i32>,
    pub image_url: Option<String>,
    pub image: Option<Vec<u8>>,
    pub image_fail_count: i32,
    pub image_download_failed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable form of [`CatalogEntry`].
#[derive(Insertable)]
#[diesel(table_name = crate::schema::catalog_entries)]
pub struct NewCatalogEntry<'a> {
    pub sku: &'a str,
    pub name: &'a str,
    pub weight: f64,
    pub cost_price: f64,
    pub stock_location_id: Option<i32>,
    pub image_url: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Field-level patch applied by the importer. `None` columns are skipped.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::catalog_entries)]
pub struct CatalogEntryChangeset<'a> {
    pub name: Option<&'a str>,
    pub weight: Option<f64>,
    pub cost_price: Option<f64>,
    pub stock_location_id: Option<i32>,
    pub image_url: Option<&'a str>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<CatalogEntry> for DomainCatalogEntry {
    type Error = TypeConstraintError;

    fn try_from(entry: CatalogEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry.id.try_into()?,
            sku: Sku::new(entry.sku)?,
            name: EntryName::new(entry.name)?,
            weight: Weight::new(entry.weight)?,
            cost_price: CostPrice::new(entry.cost_price)?,
            stock_location_id: entry.stock_location_id.map(LocationId::new).transpose()?,
            image_url: entry.image_url,
            image: entry.image,
            image_fail_count: FailCount::new(entry.image_fail_count)?,
            image_download_failed: entry.image_download_failed,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        })
    }
}

impl<'a> NewCatalogEntry<'a> {
    pub fn from_domain(entry: &'a DomainNewCatalogEntry, now: NaiveDateTime) -> Self {
        Self {
            sku: entry.sku.as_str(),
            name: entry.name.as_str(),
            weight: entry.weight.get(),
            cost_price: entry.cost_price.get(),
            stock_location_id: entry.stock_location_id.map(LocationId::get),
            image_url: entry.image_url.as_ref().map(|url| url.as_str()),
            created_at: now,
            updated_at: now,
        }
    }
}
