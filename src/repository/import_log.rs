use chrono::Utc;
use diesel::prelude::*;

use crate::domain::import_log::{ImportBatchLog, NewImportBatchLog};
use crate::domain::types::ImportLogId;
use crate::models::import_log::{
    ImportBatchLog as DbImportBatchLog, NewImportBatchLog as DbNewImportBatchLog,
};
use crate::repository::{
    DieselSession, ImportLogListQuery, ImportLogReader, ImportLogWriter, RepositoryResult,
};

impl ImportLogReader for DieselSession {
    fn list_import_logs(
        &mut self,
        query: ImportLogListQuery,
    ) -> RepositoryResult<(usize, Vec<ImportBatchLog>)> {
        use crate::schema::import_batch_logs;

        let conn = self.conn()?;

        let query_builder = || {
            let mut items = import_batch_logs::table.into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(platform) = &query.platform {
                items = items.filter(import_batch_logs::platform.eq(platform.clone()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(conn)? as usize;

        let mut items = query_builder();
        if let Some(pagination) = &query.pagination {
            let offset = ((pagination.page.max(1) - 1) * pagination.per_page) as i64;
            let limit = pagination.per_page as i64;
            items = items.offset(offset).limit(limit);
        }

        let items = items
            .order(import_batch_logs::id.desc())
            .load::<DbImportBatchLog>(conn)?
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<ImportBatchLog>, _>>()?;

        Ok((total, items))
    }

    fn get_import_log_by_id(
        &mut self,
        id: ImportLogId,
    ) -> RepositoryResult<Option<ImportBatchLog>> {
        use crate::schema::import_batch_logs;

        let conn = self.conn()?;
        let log = import_batch_logs::table
            .find(id.get())
            .first::<DbImportBatchLog>(conn)
            .optional()?;

        let log = log.map(TryInto::try_into).transpose()?;
        Ok(log)
    }
}

impl ImportLogWriter for DieselSession {
    fn create_import_log(&mut self, log: &NewImportBatchLog) -> RepositoryResult<ImportBatchLog> {
        use crate::schema::import_batch_logs;

        let db_log = DbNewImportBatchLog::from_domain(log, Utc::now().naive_utc());

        let conn = self.conn()?;
        let created = diesel::insert_into(import_batch_logs::table)
            .values(&db_log)
            .get_result::<DbImportBatchLog>(conn)?;

        Ok(created.try_into()?)
    }
}
