use chrono::Utc;
use diesel::prelude::*;

use crate::domain::customs::{CustomsMetadata, NewCustomsMetadata};
use crate::domain::types::{CustomsId, EntryId};
use crate::models::customs::{
    CustomsMetadata as DbCustomsMetadata, NewCustomsMetadata as DbNewCustomsMetadata,
};
use crate::repository::{
    CustomsReader, CustomsWriter, DieselSession, RepositoryError, RepositoryResult,
};

impl CustomsReader for DieselSession {
    fn find_customs_by_entry(
        &mut self,
        entry_id: EntryId,
    ) -> RepositoryResult<Option<CustomsMetadata>> {
        use crate::schema::customs_metadata;

        let conn = self.conn()?;
        let metadata = customs_metadata::table
            .filter(customs_metadata::entry_id.eq(entry_id.get()))
            .first::<DbCustomsMetadata>(conn)
            .optional()?;

        let metadata = metadata.map(TryInto::try_into).transpose()?;
        Ok(metadata)
    }
}

impl CustomsWriter for DieselSession {
    fn create_customs(
        &mut self,
        metadata: &NewCustomsMetadata,
    ) -> RepositoryResult<CustomsMetadata> {
        use crate::schema::customs_metadata;

        let db_metadata = DbNewCustomsMetadata::from_domain(metadata, Utc::now().naive_utc());

        let conn = self.conn()?;
        let created = diesel::insert_into(customs_metadata::table)
            .values(&db_metadata)
            .get_result::<DbCustomsMetadata>(conn)?;

        Ok(created.try_into()?)
    }

    fn update_customs(
        &mut self,
        id: CustomsId,
        metadata: &NewCustomsMetadata,
    ) -> RepositoryResult<CustomsMetadata> {
        use crate::schema::customs_metadata;

        let db_metadata = DbNewCustomsMetadata::from_domain(metadata, Utc::now().naive_utc());

        let conn = self.conn()?;
        let updated = diesel::update(customs_metadata::table.find(id.get()))
            .set(&db_metadata)
            .get_result::<DbCustomsMetadata>(conn)
            .optional()?
            .ok_or(RepositoryError::NotFound)?;

        Ok(updated.try_into()?)
    }
}
