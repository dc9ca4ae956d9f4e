use irexdb::database::Database;
use irexdb::database_config::{FlushPolicy, PersistenceMode};
use irexdb::errors::ErrorKind;
use irexdb::filter::{all, by_id};
use irexdb::{doc, val};
use irexdb_int_test::test_util::{
    cleanup, create_test_context, create_test_docs, ids, insert_test_documents, run_test,
};
use std::fs;

fn line_count(path: &std::path::Path) -> usize {
    fs::read_to_string(path)
        .map(|content| content.lines().filter(|line| !line.trim().is_empty()).count())
        .unwrap_or(0)
}

#[test]
fn test_round_trip() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            insert_test_documents(&collection)?;
            collection.update(by_id("irex-cli"), doc! { name: "irex-cli", version: 2 })?;
            collection.remove(by_id("irex-core"))?;
            let expected = collection.find(all())?;

            let ctx = ctx.reopen()?;
            let reloaded = ctx.db().collection("pkgs")?.find(all())?;
            assert_eq!(reloaded, expected);
            assert_eq!(ids(&reloaded), vec!["irex-cli", "irex-web"]);
            ctx.db().close()
        },
        cleanup,
    )
}

#[test]
fn test_log_holds_changes_and_deletion_markers() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            collection.insert(doc! { "_id": "a", x: 1 })?;
            collection.insert(doc! { "_id": "b", x: 2 })?;
            collection.update(by_id("a"), doc! { x: 3 })?;
            collection.remove(by_id("b"))?;

            let content = fs::read_to_string(ctx.datafile("pkgs"))?;
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), 4);
            assert_eq!(lines[3], r#"{"$$deleted":true,"_id":"b"}"#);

            // replay keeps the last state and compacts the redundant log
            let ctx = ctx.reopen()?;
            let reloaded = ctx.db().collection("pkgs")?.find(all())?;
            assert_eq!(reloaded, vec![doc! { "_id": "a", x: 3 }]);
            assert_eq!(line_count(&ctx.datafile("pkgs")), 1);
            ctx.db().close()
        },
        cleanup,
    )
}

#[test]
fn test_log_is_compacted_past_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::builder()
        .path(dir.path())
        .persistence_mode(PersistenceMode::AppendLog)
        .flush_policy(FlushPolicy::Immediate)
        .compaction_threshold(5)
        .open()
        .unwrap();
    let collection = db.collection("pkgs").unwrap();
    collection.insert(doc! { "_id": "a", x: 0 }).unwrap();

    let datafile = dir.path().join("pkgs.db");
    for i in 1..=20 {
        collection.update(by_id("a"), doc! { x: i }).unwrap();
        assert!(line_count(&datafile) <= 6, "datafile grew past the threshold");
    }
    db.close().unwrap();

    let db = Database::builder().path(dir.path()).open().unwrap();
    let reloaded = db.collection("pkgs").unwrap().find_one(by_id("a")).unwrap().unwrap();
    assert_eq!(reloaded.get("x").unwrap(), val!(20));
    db.close().unwrap();
}

#[test]
fn test_corrupt_lines_within_threshold_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = String::new();
    for doc in create_test_docs() {
        content.push_str(&doc.to_json().unwrap());
        content.push('\n');
    }
    for i in 0..7 {
        content.push_str(&format!("{{\"_id\":\"extra-{}\",\"n\":{}}}\n", i, i));
    }
    content.push_str("{\"_id\": \"torn\", \"n\":\n");
    fs::write(dir.path().join("pkgs.db"), content).unwrap();

    let db = Database::builder().path(dir.path()).open().unwrap();
    let collection = db.collection("pkgs").unwrap();
    assert_eq!(collection.size(), 10);
    assert!(collection.find_one(by_id("torn")).unwrap().is_none());
    db.close().unwrap();
}

#[test]
fn test_corrupt_lines_above_threshold_fail_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("pkgs.db"),
        "{\"_id\":\"a\"}\nnot json\n{\"x\": 1}\n{\"_id\":\"b\"}\n",
    )
    .unwrap();

    let db = Database::builder().path(dir.path()).open().unwrap();
    let err = db.collection("pkgs").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Persistence);
    assert!(!db.has_collection("pkgs"));

    // the datafile is left untouched for inspection
    assert_eq!(line_count(&dir.path().join("pkgs.db")), 4);
    db.close().unwrap();
}

#[test]
fn test_json_array_datafile_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("pkgs.db"),
        r#"[{"_id":"a","x":1},{"_id":"b","x":2}]"#,
    )
    .unwrap();

    let db = Database::builder().path(dir.path()).open().unwrap();
    let collection = db.collection("pkgs").unwrap();
    assert_eq!(collection.find(doc! { x: 2 }).unwrap(), vec![doc! { "_id": "b", x: 2 }]);
    db.close().unwrap();
}

#[test]
fn test_json_array_datafile_survives_appends() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("pkgs.db"),
        r#"[{"_id":"a","x":1},{"_id":"b","x":2}]"#,
    )
    .unwrap();

    let db = Database::builder()
        .path(dir.path())
        .flush_policy(FlushPolicy::Immediate)
        .open()
        .unwrap();
    db.collection("pkgs").unwrap().insert(doc! { "_id": "c", x: 3 }).unwrap();
    db.close().unwrap();

    let db = Database::builder().path(dir.path()).open().unwrap();
    let docs = db.collection("pkgs").unwrap().find(all()).unwrap();
    assert_eq!(ids(&docs), vec!["a", "b", "c"]);
    db.close().unwrap();
}
