use irexdb::collection::Document;
use irexdb::database::Database;
use irexdb::database_config::{FlushPolicy, PersistenceMode};
use irexdb::doc;
use irexdb::errors::{ErrorKind, IrexError, IrexResult};
use irexdb::filter::all;
use irexdb::store::{StoreProvider, StoreRecord};
use irexdb_int_test::test_util::{
    cleanup, create_manual_test_context, ids, insert_test_documents, open_database, run_test,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store that can be switched into failing every flush.
#[derive(Clone, Default)]
struct FlakyStore {
    failing: Arc<AtomicBool>,
    written: Arc<Mutex<Vec<StoreRecord>>>,
}

impl StoreProvider for FlakyStore {
    fn load(&self, _collection: &str) -> IrexResult<Vec<Document>> {
        Ok(Vec::new())
    }

    fn flush(
        &self,
        _collection: &str,
        records: &[StoreRecord],
        _documents: &[Arc<Document>],
    ) -> IrexResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IrexError::new("device unavailable", ErrorKind::IOError));
        }
        if let Ok(mut written) = self.written.lock() {
            written.extend_from_slice(records);
        }
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn store_name(&self) -> &'static str {
        "flaky"
    }
}

fn written_ids(store: &FlakyStore) -> Vec<String> {
    store
        .written
        .lock()
        .map(|written| {
            written
                .iter()
                .map(|record| match record {
                    StoreRecord::Put(doc) => doc.id().unwrap_or_default().to_string(),
                    StoreRecord::Delete(id) => format!("-{}", id),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_manual_policy_waits_for_save() {
    run_test(
        create_manual_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            insert_test_documents(&collection)?;

            assert!(collection.is_dirty());
            assert!(ctx.db().has_unsaved_changes());
            assert!(!ctx.datafile("pkgs").exists());

            ctx.db().save()?;
            assert!(!ctx.db().has_unsaved_changes());
            assert!(ctx.datafile("pkgs").exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_close_flushes_pending_changes() {
    run_test(
        create_manual_test_context,
        |ctx| {
            ctx.db().collection("pkgs")?.insert(doc! { "_id": "a", x: 1 })?;

            let ctx = ctx.reopen()?;
            let docs = ctx.db().collection("pkgs")?.find(all())?;
            assert_eq!(docs, vec![doc! { "_id": "a", x: 1 }]);
            ctx.db().close()
        },
        cleanup,
    )
}

#[test]
fn test_dropping_last_handle_flushes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open_database(dir.path(), PersistenceMode::Snapshot, FlushPolicy::Manual).unwrap();
        db.collection("pkgs").unwrap().insert(doc! { "_id": "a" }).unwrap();
    }

    let db = open_database(dir.path(), PersistenceMode::Snapshot, FlushPolicy::Manual).unwrap();
    assert_eq!(ids(&db.collection("pkgs").unwrap().find(all()).unwrap()), vec!["a"]);
    db.close().unwrap();
}

#[test]
fn test_interval_policy_flushes_in_background() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_database(
        dir.path(),
        PersistenceMode::AppendLog,
        FlushPolicy::Interval(Duration::from_millis(50)),
    )
    .unwrap();
    let collection = db.collection("pkgs").unwrap();
    collection.insert(doc! { "_id": "a" }).unwrap();
    collection.insert(doc! { "_id": "b" }).unwrap();

    awaitility::at_most(Duration::from_secs(5)).until(|| !db.has_unsaved_changes());
    assert!(dir.path().join("pkgs.db").exists());
    db.close().unwrap();
}

#[test]
fn test_failed_flush_keeps_changes_for_retry() {
    let store = FlakyStore::default();
    let db = Database::builder()
        .store_provider(store.clone())
        .flush_policy(FlushPolicy::Immediate)
        .open()
        .unwrap();
    let collection = db.collection("pkgs").unwrap();
    collection.insert(doc! { "_id": "a" }).unwrap();

    store.failing.store(true, Ordering::SeqCst);
    let err = collection.insert(doc! { "_id": "b" }).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Persistence);
    let err = collection.remove(doc! { "_id": "a" }).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Persistence);

    // the mutations stand in memory and stay pending
    assert_eq!(ids(&collection.find(all()).unwrap()), vec!["b"]);
    assert!(collection.is_dirty());
    assert!(db.save().is_err());

    store.failing.store(false, Ordering::SeqCst);
    db.save().unwrap();
    assert!(!collection.is_dirty());
    assert_eq!(written_ids(&store), vec!["a", "b", "-a"]);
    db.close().unwrap();
}

#[test]
fn test_failed_close_can_be_retried() {
    let store = FlakyStore::default();
    let db = Database::builder()
        .store_provider(store.clone())
        .flush_policy(FlushPolicy::Manual)
        .open()
        .unwrap();
    let collection = db.collection("pkgs").unwrap();
    collection.insert(doc! { "_id": "a" }).unwrap();

    store.failing.store(true, Ordering::SeqCst);
    let err = db.close().unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Persistence);

    // nothing is lost: the database and the collection stay usable
    assert!(!db.is_closed());
    assert!(db.has_collection("pkgs"));
    assert!(collection.is_dirty());
    collection.insert(doc! { "_id": "b" }).unwrap();

    store.failing.store(false, Ordering::SeqCst);
    db.close().unwrap();
    assert!(db.is_closed());
    assert!(collection.is_closed());
    assert_eq!(written_ids(&store), vec!["a", "b"]);
}

#[test]
fn test_save_after_failed_close() {
    let store = FlakyStore::default();
    let db = Database::builder()
        .store_provider(store.clone())
        .flush_policy(FlushPolicy::Manual)
        .open()
        .unwrap();
    db.collection("pkgs").unwrap().insert(doc! { "_id": "a" }).unwrap();

    store.failing.store(true, Ordering::SeqCst);
    assert!(db.close().is_err());

    store.failing.store(false, Ordering::SeqCst);
    db.save().unwrap();
    assert_eq!(written_ids(&store), vec!["a"]);
    db.close().unwrap();
}
