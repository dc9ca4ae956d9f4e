use irexdb::collection::{CollectionEventListener, CollectionEvents};
use irexdb::doc;
use irexdb::filter::all;
use irexdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};
use std::sync::{Arc, Mutex};

#[test]
fn test_listener_sees_every_change() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = events.clone();
            collection.subscribe(CollectionEventListener::new(move |info| {
                if let Ok(mut events) = sink.lock() {
                    events.push((info.event_type(), info.collection().to_string()));
                }
                Ok(())
            }))?;

            insert_test_documents(&collection)?;
            collection.update(doc! { kind: "bin" }, doc! { kind: "tool" })?;
            collection.remove(all())?;

            let events: Vec<CollectionEvents> = events
                .lock()
                .map(|events| {
                    assert!(events.iter().all(|(_, name)| name == "test"));
                    events.iter().map(|(event, _)| *event).collect()
                })
                .unwrap_or_default();
            assert_eq!(events.len(), 7);
            assert_eq!(&events[..3], &[CollectionEvents::Insert; 3]);
            assert_eq!(events[3], CollectionEvents::Update);
            assert_eq!(&events[4..], &[CollectionEvents::Remove; 3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failing_listener_does_not_fail_mutation() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.subscribe(CollectionEventListener::new(|_| {
                Err(irexdb::errors::IrexError::new(
                    "listener broke",
                    irexdb::errors::ErrorKind::InternalError,
                ))
            }))?;

            collection.insert(doc! { "_id": "a" })?;
            assert_eq!(collection.size(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe_stops_events() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let count = Arc::new(Mutex::new(0));
            let sink = count.clone();
            let subscriber = collection.subscribe(CollectionEventListener::new(move |_| {
                if let Ok(mut count) = sink.lock() {
                    *count += 1;
                }
                Ok(())
            }))?;

            collection.insert(doc! { "_id": "a" })?;
            collection.unsubscribe(subscriber)?;
            collection.insert(doc! { "_id": "b" })?;

            assert_eq!(count.lock().map(|c| *c).unwrap_or(0), 1);
            Ok(())
        },
        cleanup,
    )
}
