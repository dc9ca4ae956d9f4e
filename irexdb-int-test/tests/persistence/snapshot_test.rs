use irexdb::doc;
use irexdb::filter::{all, by_id};
use irexdb_int_test::test_util::{
    cleanup, create_snapshot_test_context, ids, insert_test_documents, run_test,
};
use std::fs;

#[test]
fn test_snapshot_round_trip() {
    run_test(
        create_snapshot_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            insert_test_documents(&collection)?;
            collection.remove(by_id("irex-cli"))?;
            collection.insert(doc! { "_id": "irex-cli", name: "irex-cli", version: 4 })?;

            let ctx = ctx.reopen()?;
            let reloaded = ctx.db().collection("pkgs")?.find(all())?;
            assert_eq!(ids(&reloaded), vec!["irex-core", "irex-web", "irex-cli"]);
            assert_eq!(reloaded[2], doc! { "_id": "irex-cli", name: "irex-cli", version: 4 });
            ctx.db().close()
        },
        cleanup,
    )
}

#[test]
fn test_snapshot_holds_only_live_documents() {
    run_test(
        create_snapshot_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            insert_test_documents(&collection)?;
            collection.update(doc! { kind: "lib" }, doc! { kind: "archived" })?;
            collection.remove(by_id("irex-web"))?;

            let content = fs::read_to_string(ctx.datafile("pkgs"))?;
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), 2);
            assert!(lines.iter().all(|line| !line.contains("$$deleted")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_collections_have_separate_datafiles() {
    run_test(
        create_snapshot_test_context,
        |ctx| {
            ctx.db().collection("pkgs")?.insert(doc! { "_id": "a" })?;
            ctx.db().collection("users")?.insert(doc! { "_id": "u" })?;

            assert!(ctx.datafile("pkgs").exists());
            assert!(ctx.datafile("users").exists());

            let ctx = ctx.reopen()?;
            let mut names = vec![];
            for name in ["pkgs", "users"] {
                let docs = ctx.db().collection(name)?.find(all())?;
                names.extend(ids(&docs));
            }
            assert_eq!(names, vec!["a", "u"]);
            ctx.db().close()
        },
        cleanup,
    )
}

#[test]
fn test_empty_collection_reopens_empty() {
    run_test(
        create_snapshot_test_context,
        |ctx| {
            let collection = ctx.db().collection("pkgs")?;
            collection.insert(doc! { "_id": "a" })?;
            collection.remove(all())?;

            let ctx = ctx.reopen()?;
            assert_eq!(ctx.db().collection("pkgs")?.size(), 0);
            ctx.db().close()
        },
        cleanup,
    )
}
