use diesel::prelude::*;
use product_import::domain::catalog::{CatalogEntryChanges, NewCatalogEntry};
use product_import::domain::customs::NewCustomsMetadata;
use product_import::domain::import_log::NewImportBatchLog;
use product_import::domain::types::{
    BatchName, DeclaredPrice, EntryName, FailCount, ImageUrl, RowCount, Sku,
};
use product_import::repository::{
    CatalogReader, CatalogWriter, Checkpoint, CustomsReader, CustomsWriter, DieselRepository,
    ImageBackfillStore, ImportLogListQuery, ImportLogReader, ImportLogWriter, RepositoryError,
};
use product_import::schema::{catalog_entries, customs_metadata};

mod common;

fn new_entry(sku: &str, image_url: Option<&str>) -> NewCatalogEntry {
    let mut entry = NewCatalogEntry::new(
        Sku::new(sku).expect("valid sku"),
        EntryName::new(format!("Item {sku}")).expect("valid name"),
    );
    entry.image_url = image_url.map(|url| ImageUrl::new(url).expect("valid url"));
    entry
}

fn new_log(name: &str, platform: &str) -> NewImportBatchLog {
    NewImportBatchLog {
        name: BatchName::new(name).expect("valid name"),
        platform: platform.to_string(),
        stock_location_id: None,
        total: RowCount::from_usize(2),
        success: RowCount::from_usize(1),
        failed: RowCount::from_usize(1),
        skipped: RowCount::from_usize(0),
        message: "Row 3 (SKU: B): failed".to_string(),
        import_file: vec![1, 2, 3],
    }
}

#[test]
fn checkpoint_makes_entries_visible_to_other_sessions() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    let mut session = repo.session().expect("session");
    let created = session
        .create_entry(&new_entry("SKU-1", None))
        .expect("should create entry");
    assert_eq!(session.cached_entries(), 1);
    session.checkpoint().expect("should commit");
    assert_eq!(session.cached_entries(), 0);
    drop(session);

    let mut other = repo.session().expect("session");
    let found = other
        .find_by_sku(&Sku::new("SKU-1").unwrap())
        .expect("lookup works")
        .expect("entry committed");
    assert_eq!(found.id, created.id);
    assert_eq!(found.name, "Item SKU-1");
}

#[test]
fn dropping_a_session_discards_uncommitted_work() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    {
        let mut session = repo.session().expect("session");
        session
            .create_entry(&new_entry("SKU-1", None))
            .expect("should create entry");
    }

    let mut session = repo.session().expect("session");
    assert!(
        session
            .find_by_sku(&Sku::new("SKU-1").unwrap())
            .expect("lookup works")
            .is_none()
    );
}

#[test]
fn rollback_discards_only_work_since_last_checkpoint() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    session.create_entry(&new_entry("KEPT", None)).unwrap();
    session.checkpoint().unwrap();
    session.create_entry(&new_entry("LOST", None)).unwrap();
    session.rollback().expect("should roll back");

    assert!(session.find_by_sku(&Sku::new("KEPT").unwrap()).unwrap().is_some());
    assert!(session.find_by_sku(&Sku::new("LOST").unwrap()).unwrap().is_none());
}

#[test]
fn duplicate_sku_is_a_row_level_error() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    session.create_entry(&new_entry("SKU-1", None)).unwrap();
    let err = session.create_entry(&new_entry("SKU-1", None)).unwrap_err();

    assert!(matches!(err, RepositoryError::Database(_)));
    assert!(!err.is_fatal());
}

#[test]
fn new_image_url_resets_download_state() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let entry = session
        .create_entry(&new_entry("SKU-1", Some("https://cdn.example.com/a.jpg")))
        .unwrap();
    session.store_image(entry.id, &[1, 2, 3]).unwrap();
    session
        .record_image_failure(entry.id, FailCount::new(2).unwrap(), false)
        .unwrap();

    let changes = CatalogEntryChanges {
        image_url: Some(ImageUrl::new("https://cdn.example.com/b.jpg").unwrap()),
        ..Default::default()
    };
    let updated = session.update_entry(entry.id, &changes).unwrap();

    assert_eq!(
        updated.image_url.as_deref(),
        Some("https://cdn.example.com/b.jpg")
    );
    assert!(updated.image.is_none());
    assert_eq!(updated.image_fail_count, 0);
}

#[test]
fn customs_metadata_follows_its_entry() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let entry = session.create_entry(&new_entry("SKU-1", None)).unwrap();
    let metadata = NewCustomsMetadata {
        entry_id: entry.id,
        source_url: Some("https://shop.example.com/1".to_string()),
        declared_name_en: Some("Mug".to_string()),
        declared_name_cn: None,
        declared_price: DeclaredPrice::new(2.5).unwrap(),
    };
    let created = session.create_customs(&metadata).unwrap();

    let changed = NewCustomsMetadata {
        declared_name_cn: Some("杯子".to_string()),
        ..metadata.clone()
    };
    session.update_customs(created.id, &changed).unwrap();
    let stored = session
        .find_customs_by_entry(entry.id)
        .unwrap()
        .expect("metadata exists");
    assert_eq!(stored.declared_name_cn.as_deref(), Some("杯子"));
    assert!(session.create_customs(&metadata).is_err());
    session.checkpoint().unwrap();
    drop(session);

    let mut conn = test_db.pool().get().unwrap();
    diesel::delete(catalog_entries::table.find(entry.id.get()))
        .execute(&mut conn)
        .expect("entry deleted");
    let remaining: i64 = customs_metadata::table
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn image_candidates_skip_loopback_failed_and_downloaded() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let pending = session
        .create_entry(&new_entry("PENDING", Some("https://cdn.example.com/p.jpg")))
        .unwrap();
    session
        .create_entry(&new_entry("LOCAL", Some("http://localhost:8000/a.jpg")))
        .unwrap();
    session
        .create_entry(&new_entry("LOOPBACK", Some("http://127.0.0.1/a.jpg")))
        .unwrap();
    session.create_entry(&new_entry("NO-URL", None)).unwrap();
    let failed = session
        .create_entry(&new_entry("FAILED", Some("https://cdn.example.com/f.jpg")))
        .unwrap();
    session
        .record_image_failure(failed.id, FailCount::new(3).unwrap(), true)
        .unwrap();
    let done = session
        .create_entry(&new_entry("DONE", Some("https://cdn.example.com/d.jpg")))
        .unwrap();
    session.store_image(done.id, &[9]).unwrap();
    let later = session
        .create_entry(&new_entry("LATER", Some("https://cdn.example.com/l.jpg")))
        .unwrap();

    let candidates = session.list_image_candidates(10).unwrap();
    let ids: Vec<_> = candidates.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![pending.id, later.id]);

    let limited = session.list_image_candidates(1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, pending.id);

    assert_eq!(
        session.reset_image_failure(&Sku::new("FAILED").unwrap()).unwrap(),
        1
    );
    assert_eq!(session.list_image_candidates(10).unwrap().len(), 3);
}

#[test]
fn stored_payload_is_found_by_url() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");
    let url = "https://cdn.example.com/shared.jpg";

    let first = session.create_entry(&new_entry("A", Some(url))).unwrap();
    let second = session.create_entry(&new_entry("B", Some(url))).unwrap();
    assert!(session.find_image_by_url(url, second.id).unwrap().is_none());

    session.store_image(first.id, &[4, 2]).unwrap();

    assert_eq!(
        session.find_image_by_url(url, second.id).unwrap(),
        Some(vec![4, 2])
    );
    assert!(session.find_image_by_url(url, first.id).unwrap().is_none());
}

#[test]
fn failed_image_write_keeps_other_pending_work() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let entry = session
        .create_entry(&new_entry("SKU-1", Some("https://cdn.example.com/a.jpg")))
        .unwrap();
    session.store_image(entry.id, &[1]).unwrap();
    let missing = product_import::domain::types::EntryId::new(999).unwrap();
    let err = session.store_image(missing, &[2]).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
    session.checkpoint().unwrap();
    drop(session);

    let mut session = repo.session().expect("session");
    let stored = session.get_entry_by_id(entry.id).unwrap().unwrap();
    assert_eq!(stored.image, Some(vec![1]));
}

#[test]
fn import_logs_are_listed_newest_first() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let first = session.create_import_log(&new_log("a.xlsx", "dianxiaomi")).unwrap();
    let second = session.create_import_log(&new_log("b.xlsx", "mabangerp")).unwrap();
    session.checkpoint().unwrap();

    let (total, logs) = session
        .list_import_logs(ImportLogListQuery::default())
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(logs[0].id, second.id);
    assert_eq!(logs[1].id, first.id);

    let (total, logs) = session
        .list_import_logs(ImportLogListQuery::default().platform("dianxiaomi"))
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(logs[0].name, "a.xlsx");

    let (total, page) = session
        .list_import_logs(ImportLogListQuery::default().paginate(2, 1))
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(page[0].id, first.id);

    let stored = session
        .get_import_log_by_id(first.id)
        .unwrap()
        .expect("log exists");
    assert_eq!(stored.import_file, vec![1, 2, 3]);
    assert_eq!(stored.messages().count(), 1);
}

#[test]
fn image_candidates_use_parsed_host_for_loopback_check() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    let public_subdomain = session
        .create_entry(&new_entry(
            "PUBLIC-HOST",
            Some("https://localhost.example.com/a.jpg"),
        ))
        .unwrap();
    let loopback_in_query = session
        .create_entry(&new_entry(
            "QUERY",
            Some("https://cdn.example.com/a.jpg?from=http://127.0.0.1/x"),
        ))
        .unwrap();
    session
        .create_entry(&new_entry("IPV6", Some("http://[0:0:0:0:0:0:0:1]/a.jpg")))
        .unwrap();
    session
        .create_entry(&new_entry("USERINFO", Some("http://user@127.0.0.1/a.jpg")))
        .unwrap();
    session
        .create_entry(&new_entry("SUBDOMAIN", Some("http://img.localhost/a.jpg")))
        .unwrap();
    session.checkpoint().unwrap();

    let ids: Vec<_> = session
        .list_image_candidates(10)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![public_subdomain.id, loopback_in_query.id]);

    let limited = session.list_image_candidates(1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, public_subdomain.id);
}

#[test]
fn image_candidates_page_past_loopback_entries() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());
    let mut session = repo.session().expect("session");

    for n in 0..250 {
        session
            .create_entry(&new_entry(
                &format!("LOCAL-{n}"),
                Some("http://localhost:8000/a.jpg"),
            ))
            .unwrap();
    }
    let remote = session
        .create_entry(&new_entry("REMOTE", Some("https://cdn.example.com/r.jpg")))
        .unwrap();
    session.checkpoint().unwrap();

    let candidates = session.list_image_candidates(5).unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, remote.id);
}
