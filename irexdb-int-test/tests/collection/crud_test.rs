use irexdb::common::Value;
use irexdb::database::Database;
use irexdb::errors::ErrorKind;
use irexdb::filter::{all, by_id, field};
use irexdb::{doc, val};
use irexdb_int_test::test_util::{
    cleanup, create_test_context, ids, insert_test_documents, run_test,
};
use std::sync::Arc;

#[test]
fn test_pkgs_scenario() {
    run_test(
        create_test_context,
        |ctx| {
            let pkgs = ctx.db().collection("pkgs")?;
            pkgs.insert(doc! { "_id": "a", x: 1 })?;
            pkgs.insert(doc! { "_id": "b", x: 2 })?;

            let found = pkgs.find(doc! { x: 2 })?;
            assert_eq!(found, vec![doc! { "_id": "b", x: 2 }]);

            assert_eq!(pkgs.remove(doc! { x: 1 })?, 1);
            assert_eq!(pkgs.find(doc! {})?, vec![doc! { "_id": "b", x: 2 }]);

            let upserted = pkgs.upsert(doc! { "_id": "c" }, doc! { "_id": "c", x: 3 })?;
            assert_eq!(upserted, doc! { "_id": "c", x: 3 });
            assert_eq!(pkgs.size(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_generates_unique_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let mut seen = std::collections::HashSet::new();
            for i in 0..50 {
                let stored = collection.insert(doc! { n: i })?;
                let id = stored.id().map(|id| id.to_string());
                assert!(id.is_some());
                assert!(seen.insert(id));
            }
            assert_eq!(collection.size(), 50);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_id_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let err = collection
                .insert(doc! { "_id": "irex-cli", name: "other" })
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

            let stored = collection.find_one(by_id("irex-cli"))?.unwrap();
            assert_eq!(stored.get("name")?, val!("irex-cli"));
            assert_eq!(collection.size(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_results_are_deep_copies() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let mut found = collection.find(doc! { kind: "lib" })?;
            for doc in found.iter_mut() {
                doc.put("meta.owner", "mallory")?;
                doc.put("kind", "changed")?;
            }

            let inserted = collection.insert(doc! { "_id": "fresh", meta: { owner: "ops" } })?;
            let mut returned = inserted.clone();
            returned.put("meta.owner", "mallory")?;

            for doc in collection.find(all())? {
                assert_ne!(doc.get("meta.owner")?, val!("mallory"));
                assert_ne!(doc.get("kind")?, val!("changed"));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_no_deep_copy_shares_stored_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let first = collection.find_no_deep_copy(doc! { kind: "lib" })?;
            let second = collection.find_no_deep_copy(doc! { kind: "lib" })?;
            assert_eq!(first.len(), 2);
            assert!(first.iter().zip(second.iter()).all(|(a, b)| Arc::ptr_eq(a, b)));

            // an update swaps in a new document; old references keep the old content
            collection.update(by_id("irex-core"), doc! { name: "renamed" })?;
            assert_eq!(first[0].get("name")?, val!("irex-core"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_replaces_content() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let count = collection.update(doc! { kind: "lib" }, doc! { kind: "archived" })?;
            assert_eq!(count, 2);

            let archived = collection.find(doc! { kind: "archived" })?;
            assert_eq!(ids(&archived), vec!["irex-core", "irex-web"]);
            assert_eq!(archived[0].get("name")?, Value::Null);

            assert_eq!(collection.update(doc! { kind: "lib" }, doc! { kind: "x" })?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_upsert_paths() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let err = collection
                .upsert(doc! { kind: "lib" }, doc! { kind: "lib", version: 9 })
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::AmbiguousUpsert);
            assert_eq!(collection.count(doc! { version: 9 })?, 0);

            let updated = collection.upsert(doc! { name: "irex-cli" }, doc! { name: "irex-cli", version: 2 })?;
            assert_eq!(updated.id(), Some("irex-cli"));
            assert_eq!(updated.get("version")?, val!(2));

            let inserted = collection.upsert(
                field("name").eq("irex-new").and(field("version").gt(1)),
                doc! { kind: "lib" },
            )?;
            assert_eq!(inserted.get("name")?, val!("irex-new"));
            assert!(!inserted.contains_key("version"));
            assert_eq!(collection.size(), 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_everything() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;
            assert_eq!(collection.remove(all())?, 3);
            assert!(collection.find(all())?.is_empty());
            assert!(collection.find_one(all())?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_timestamps() {
    let db = Database::builder().timestamps(true).open().unwrap();
    let collection = db.collection("test").unwrap();

    let inserted = collection.insert(doc! { "_id": "a" }).unwrap();
    let created = inserted.get("createdAt").unwrap();
    assert!(created.as_i64().is_some());

    std::thread::sleep(std::time::Duration::from_millis(5));
    collection.update(by_id("a"), doc! { x: 1 }).unwrap();
    let updated = collection.find_one(by_id("a")).unwrap().unwrap();
    assert_eq!(updated.get("createdAt").unwrap(), created);
    assert!(updated.get("updatedAt").unwrap().as_i64() > created.as_i64());
    db.close().unwrap();
}

#[test]
fn test_collection_stats() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let stats = collection.stats()?;
            assert_eq!(stats.document_count, 3);
            assert!(stats.approximate_size > 0);
            assert_eq!(stats.field_counts.get("meta.owner"), Some(&3));
            assert_eq!(stats.field_counts.get("_id"), None);
            Ok(())
        },
        cleanup,
    )
}
