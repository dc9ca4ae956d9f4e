use irexdb::collection::Document;
use irexdb::database_config::{FlushPolicy, PersistenceMode};
use irexdb::doc;
use irexdb::errors::{ErrorKind, IrexResult};
use irexdb::filter::{all, by_id};
use irexdb_int_test::test_util::{create_context, ids};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_future_form_applies_in_call_order() -> IrexResult<()> {
    let ctx = create_context(PersistenceMode::AppendLog, FlushPolicy::Immediate)?;
    let pkgs = ctx.db().collection("pkgs")?;

    let pending = vec![
        pkgs.insert_async(doc! { "_id": "a", x: 1 }),
        pkgs.insert_async(doc! { "_id": "b", x: 2 }),
        pkgs.upsert_async(doc! { "_id": "a" }, doc! { x: 10 }),
    ];
    let removed = pkgs.remove_async(doc! { x: 2 });

    // in-memory state already reflects every call, in call order
    assert_eq!(ids(&pkgs.find(all())?), vec!["a"]);

    // resolve out of order; the outcome does not change
    assert_eq!(removed.await?, 1);
    for result in futures::future::join_all(pending.into_iter().rev()).await {
        result?;
    }

    let reopened = ctx.reopen()?;
    let docs = reopened.db().collection("pkgs")?.find(all())?;
    assert_eq!(docs, vec![doc! { "_id": "a", x: 10 }]);
    reopened.db().close()
}

#[tokio::test]
async fn test_future_form_reports_same_errors() -> IrexResult<()> {
    let ctx = create_context(PersistenceMode::AppendLog, FlushPolicy::Immediate)?;
    let pkgs = ctx.db().collection("pkgs")?;
    pkgs.insert_many_async(vec![doc! { "_id": "a", k: 1 }, doc! { "_id": "b", k: 1 }])
        .await?;

    let err = pkgs.insert_async(doc! { "_id": "a" }).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateKey);

    let err = pkgs.upsert_async(doc! { k: 1 }, doc! { k: 2 }).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::AmbiguousUpsert);

    let err = pkgs.update_async(doc! { k: { "$in": 1 } }, doc! {}).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MalformedQuery);

    assert_eq!(pkgs.update_async(doc! { k: 5 }, doc! { k: 6 }).await?, 0);
    ctx.db().close()
}

#[tokio::test]
async fn test_save_async_flushes_manual_policy() -> IrexResult<()> {
    let ctx = create_context(PersistenceMode::Snapshot, FlushPolicy::Manual)?;
    let pkgs = ctx.db().collection("pkgs")?;
    pkgs.insert_async(doc! { "_id": "a" }).await?;
    assert!(pkgs.is_dirty());

    pkgs.save_async().await?;
    assert!(!pkgs.is_dirty());
    assert!(ctx.datafile("pkgs").exists());
    ctx.db().close()
}

#[tokio::test]
async fn test_callback_form() -> IrexResult<()> {
    let ctx = create_context(PersistenceMode::AppendLog, FlushPolicy::Immediate)?;
    let pkgs = ctx.db().collection("pkgs")?;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let sender = tx.clone();
    pkgs.insert_with(doc! { "_id": "a", x: 1 }, move |result: IrexResult<Document>| {
        let _ = sender.send(format!("insert {}", result.is_ok()));
    })?;

    let sender = tx.clone();
    pkgs.update_with(by_id("a"), doc! { x: 2 }, move |result| {
        let _ = sender.send(format!("update {:?}", result.ok()));
    })?;

    let sender = tx.clone();
    pkgs.upsert_with(by_id("a"), doc! { x: 3 }, move |result| {
        let _ = sender.send(format!("upsert {}", result.is_ok()));
    })?;

    pkgs.remove_with(by_id("a"), move |result| {
        let _ = tx.send(format!("remove {:?}", result.ok()));
    })?;

    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages.sort();
    assert_eq!(
        messages,
        vec!["insert true", "remove Some(1)", "update Some(1)", "upsert true"]
    );
    assert_eq!(pkgs.size(), 0);
    ctx.db().close()
}
