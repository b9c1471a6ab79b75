use chrono::Utc;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::domain::catalog::CatalogEntry;
use crate::domain::types::{EntryId, FailCount, ImageUrl, Sku};
use crate::models::catalog::CatalogEntry as DbCatalogEntry;
use crate::repository::{DieselSession, ImageBackfillStore, RepositoryError, RepositoryResult};

/// Rows loaded per query while collecting candidates.
const CANDIDATE_PAGE: i64 = 200;

impl ImageBackfillStore for DieselSession {
    fn list_image_candidates(&mut self, limit: usize) -> RepositoryResult<Vec<CatalogEntry>> {
        use crate::schema::catalog_entries;

        let conn = self.read_conn();
        let mut candidates = Vec::new();
        let mut after_id = 0;

        while candidates.len() < limit {
            let page = catalog_entries::table
                .filter(catalog_entries::id.gt(after_id))
                .filter(catalog_entries::image_url.is_not_null())
                .filter(catalog_entries::image_url.ne(""))
                .filter(
                    catalog_entries::image
                        .is_null()
                        .or(catalog_entries::image.eq(Vec::<u8>::new())),
                )
                .filter(catalog_entries::image_download_failed.eq(false))
                .order(catalog_entries::id.asc())
                .limit(CANDIDATE_PAGE)
                .load::<DbCatalogEntry>(conn)?;

            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            let exhausted = page.len() < CANDIDATE_PAGE as usize;

            for row in page {
                let entry = CatalogEntry::try_from(row)?;
                let loopback = entry
                    .image_url
                    .as_deref()
                    .and_then(|url| ImageUrl::new(url).ok())
                    .is_some_and(|url| url.is_loopback());
                if loopback {
                    continue;
                }
                candidates.push(entry);
                if candidates.len() == limit {
                    break;
                }
            }

            if exhausted {
                break;
            }
        }

        Ok(candidates)
    }

    fn find_image_by_url(
        &mut self,
        url: &str,
        exclude: EntryId,
    ) -> RepositoryResult<Option<Vec<u8>>> {
        use crate::schema::catalog_entries;

        let conn = self.read_conn();
        let image = catalog_entries::table
            .filter(catalog_entries::image_url.eq(url))
            .filter(catalog_entries::id.ne(exclude.get()))
            .filter(catalog_entries::image.is_not_null())
            .filter(catalog_entries::image.ne(Vec::<u8>::new()))
            .select(catalog_entries::image)
            .first::<Option<Vec<u8>>>(conn)
            .optional()?;

        Ok(image.flatten())
    }

    fn store_image(&mut self, id: EntryId, image: &[u8]) -> RepositoryResult<()> {
        use crate::schema::catalog_entries;

        self.cache.clear();
        let now = Utc::now().naive_utc();
        let conn = self.conn()?;

        // Nested transaction: a savepoint scoped to this entry.
        let affected = conn.transaction::<_, DieselError, _>(|conn| {
            diesel::update(catalog_entries::table.find(id.get()))
                .set((
                    catalog_entries::image.eq(image),
                    catalog_entries::image_fail_count.eq(0),
                    catalog_entries::image_download_failed.eq(false),
                    catalog_entries::updated_at.eq(now),
                ))
                .execute(conn)
        })?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn record_image_failure(
        &mut self,
        id: EntryId,
        fail_count: FailCount,
        failed: bool,
    ) -> RepositoryResult<()> {
        use crate::schema::catalog_entries;

        self.cache.clear();
        let now = Utc::now().naive_utc();
        let conn = self.conn()?;

        let affected = conn.transaction::<_, DieselError, _>(|conn| {
            diesel::update(catalog_entries::table.find(id.get()))
                .set((
                    catalog_entries::image_fail_count.eq(fail_count.get()),
                    catalog_entries::image_download_failed.eq(failed),
                    catalog_entries::updated_at.eq(now),
                ))
                .execute(conn)
        })?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn reset_image_failure(&mut self, sku: &Sku) -> RepositoryResult<usize> {
        use crate::schema::catalog_entries;

        self.cache.clear();
        let now = Utc::now().naive_utc();
        let conn = self.conn()?;

        let affected = diesel::update(
            catalog_entries::table.filter(catalog_entries::sku.eq(sku.as_str())),
        )
        .set((
            catalog_entries::image_fail_count.eq(0),
            catalog_entries::image_download_failed.eq(false),
            catalog_entries::updated_at.eq(now),
        ))
        .execute(conn)?;

        Ok(affected)
    }
}
