use chrono::Utc;
use diesel::prelude::*;

use crate::domain::catalog::{CatalogEntry, CatalogEntryChanges, NewCatalogEntry};
use crate::domain::types::{EntryId, LocationId, Sku};
use crate::models::catalog::{
    CatalogEntry as DbCatalogEntry, CatalogEntryChangeset, NewCatalogEntry as DbNewCatalogEntry,
};
use crate::repository::{
    CatalogReader, CatalogWriter, DieselSession, RepositoryError, RepositoryResult,
};

impl DieselSession {
    fn remember(&mut self, entry: CatalogEntry) -> CatalogEntry {
        self.cache.insert(entry.sku.as_str().to_string(), entry.clone());
        entry
    }
}

impl CatalogReader for DieselSession {
    fn find_by_sku(&mut self, sku: &Sku) -> RepositoryResult<Option<CatalogEntry>> {
        use crate::schema::catalog_entries;

        if let Some(entry) = self.cache.get(sku.as_str()) {
            return Ok(Some(entry.clone()));
        }

        let conn = self.conn()?;
        let entry = catalog_entries::table
            .filter(catalog_entries::sku.eq(sku.as_str()))
            .first::<DbCatalogEntry>(conn)
            .optional()?;

        let entry: Option<CatalogEntry> = entry.map(TryInto::try_into).transpose()?;
        Ok(entry.map(|entry| self.remember(entry)))
    }

    fn get_entry_by_id(&mut self, id: EntryId) -> RepositoryResult<Option<CatalogEntry>> {
        use crate::schema::catalog_entries;

        let conn = self.conn()?;
        let entry = catalog_entries::table
            .find(id.get())
            .first::<DbCatalogEntry>(conn)
            .optional()?;

        let entry = entry.map(TryInto::try_into).transpose()?;
        Ok(entry)
    }
}

impl CatalogWriter for DieselSession {
    fn create_entry(&mut self, entry: &NewCatalogEntry) -> RepositoryResult<CatalogEntry> {
        use crate::schema::catalog_entries;

        let now = Utc::now().naive_utc();
        let db_entry = DbNewCatalogEntry::from_domain(entry, now);

        let conn = self.conn()?;
        let created = diesel::insert_into(catalog_entries::table)
            .values(&db_entry)
            .get_result::<DbCatalogEntry>(conn)?;

        let created: CatalogEntry = created.try_into()?;
        Ok(self.remember(created))
    }

    fn update_entry(
        &mut self,
        id: EntryId,
        changes: &CatalogEntryChanges,
    ) -> RepositoryResult<CatalogEntry> {
        use crate::schema::catalog_entries;

        if changes.is_empty() {
            return self.get_entry_by_id(id)?.ok_or(RepositoryError::NotFound);
        }

        let changeset = CatalogEntryChangeset {
            name: changes.name.as_ref().map(|name| name.as_str()),
            weight: changes.weight.map(|weight| weight.get()),
            cost_price: changes.cost_price.map(|cost| cost.get()),
            stock_location_id: changes.stock_location_id.map(LocationId::get),
            image_url: changes.image_url.as_ref().map(|url| url.as_str()),
            updated_at: Some(Utc::now().naive_utc()),
        };

        let conn = self.conn()?;
        let target = diesel::update(catalog_entries::table.find(id.get()));
        let updated = if changes.image_url.is_some() {
            // A new URL makes the entry pending again.
            target
                .set((
                    &changeset,
                    catalog_entries::image.eq(None::<Vec<u8>>),
                    catalog_entries::image_fail_count.eq(0),
                    catalog_entries::image_download_failed.eq(false),
                ))
                .get_result::<DbCatalogEntry>(conn)
                .optional()?
        } else {
            target
                .set(&changeset)
                .get_result::<DbCatalogEntry>(conn)
                .optional()?
        };

        let updated: CatalogEntry = updated.ok_or(RepositoryError::NotFound)?.try_into()?;
        Ok(self.remember(updated))
    }
}
