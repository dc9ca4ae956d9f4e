use irexdb::collection::{Document, FindOptions};
use irexdb::doc;
use irexdb::errors::{ErrorKind, IrexResult};
use irexdb::filter::field;
use irexdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

fn assert_malformed<T: std::fmt::Debug>(result: IrexResult<T>) {
    match result {
        Err(e) => assert_eq!(e.kind(), &ErrorKind::MalformedQuery, "unexpected error {}", e),
        Ok(value) => panic!("expected MalformedQuery, got {:?}", value),
    }
}

fn malformed_queries() -> Vec<Document> {
    vec![
        doc! { version: { "$near": 1 } },
        doc! { "$xor": [{ a: 1 }] },
        doc! { "$or": { a: 1 } },
        doc! { "$and": [1, 2] },
        doc! { "$not": [{ a: 1 }] },
        doc! { version: { "$gt": 1, plain: 2 } },
        doc! { version: { "$gt": [1, 2] } },
        doc! { kind: { "$in": "lib" } },
        doc! { kind: { "$exists": "yes" } },
        doc! { name: { "$regex": "irex(" } },
        doc! { tags: { "$size": (-2) } },
        doc! { tags: { "$elemMatch": 3 } },
    ]
}

#[test]
fn test_malformed_queries_fail_on_every_read() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            for query in malformed_queries() {
                assert_malformed(collection.find(query.clone()));
                assert_malformed(collection.find_one(query.clone()));
                assert_malformed(collection.count(query.clone()));
                assert_malformed(collection.find_with_options(query.clone(), FindOptions::new()));
                assert_malformed(collection.find_no_deep_copy(query));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_queries_fail_on_empty_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("empty")?;
            for query in malformed_queries() {
                assert_malformed(collection.find(query));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_queries_leave_data_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;
            let before = collection.find(doc! {})?;

            for query in malformed_queries() {
                assert_malformed(collection.update(query.clone(), doc! { kind: "gone" }));
                assert_malformed(collection.upsert(query.clone(), doc! { kind: "gone" }));
                assert_malformed(collection.remove(query));
            }

            assert_eq!(collection.find(doc! {})?, before);
            assert!(!collection.is_dirty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_built_filters_are_malformed() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_malformed(collection.find(field("name").regex("[unclosed")));
            assert_malformed(collection.find(field("").eq(1)));
            assert_malformed(collection.find(field("meta..owner").eq("ops")));
            Ok(())
        },
        cleanup,
    )
}
