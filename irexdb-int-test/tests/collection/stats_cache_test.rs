use irexdb::database::Database;
use irexdb::doc;
use irexdb::errors::{ErrorKind, IrexResult};
use std::time::Duration;

#[tokio::test]
async fn test_stats_cache_serves_until_expiry() -> IrexResult<()> {
    let db = Database::builder().open()?;
    let pkgs = db.collection("pkgs")?;
    pkgs.insert(doc! { "_id": "a", x: 1 })?;

    let cache = pkgs.stats_cache(Duration::from_millis(200));
    assert_eq!(cache.get_value().await?.document_count, 1);

    pkgs.insert(doc! { "_id": "b", x: 2 })?;
    assert!(cache.is_fresh());
    assert_eq!(cache.get_value().await?.document_count, 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!cache.is_fresh());
    assert_eq!(cache.get_value().await?.document_count, 2);
    db.close()
}

#[tokio::test]
async fn test_stats_cache_invalidate() -> IrexResult<()> {
    let db = Database::builder().open()?;
    let pkgs = db.collection("pkgs")?;
    let cache = pkgs.stats_cache(Duration::from_secs(60));
    assert_eq!(cache.get_value().await?.document_count, 0);

    pkgs.insert(doc! { "_id": "a" })?;
    cache.invalidate();

    // the stale read keeps the last value, a plain read refreshes
    assert_eq!(cache.get_value_stale().await?.document_count, 0);
    assert_eq!(cache.get_value().await?.document_count, 1);
    db.close()
}

#[tokio::test]
async fn test_stats_cache_keeps_value_when_refresh_fails() -> IrexResult<()> {
    let db = Database::builder().open()?;
    let pkgs = db.collection("pkgs")?;
    pkgs.insert(doc! { "_id": "a" })?;

    let cache = pkgs.stats_cache(Duration::from_millis(1));
    assert_eq!(cache.get_value().await?.document_count, 1);

    db.close()?;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = cache.get_value().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ValueCacheRefresh);
    assert_eq!(cache.get_value_stale().await?.document_count, 1);
    Ok(())
}
