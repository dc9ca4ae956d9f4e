use irexdb::collection::{order_by, Document, FindOptions};
use irexdb::common::{SortOrder, Value};
use irexdb::doc;
use irexdb::filter::{all, and, field, nor, not, or};
use irexdb_int_test::test_util::{cleanup, create_test_context, ids, insert_test_documents, run_test};

#[test]
fn test_plain_fields_are_a_conjunction() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.insert(doc! { "_id": "1", a: 1, b: 2 })?;
            collection.insert(doc! { "_id": "2", a: 1, b: 3 })?;
            collection.insert(doc! { "_id": "3", a: 2, b: 2 })?;

            assert_eq!(ids(&collection.find(doc! { a: 1, b: 2 })?), vec!["1"]);
            assert_eq!(ids(&collection.find(doc! { a: 1 })?), vec!["1", "2"]);
            assert_eq!(collection.find(doc! {})?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_field_matches_null() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.insert(doc! { "_id": "1", a: 1 })?;
            collection.insert(doc! { "_id": "2", a: 1, b: (Value::Null) })?;
            collection.insert(doc! { "_id": "3", a: 1, b: 0 })?;

            assert_eq!(ids(&collection.find(doc! { b: (Value::Null) })?), vec!["1", "2"]);
            assert_eq!(ids(&collection.find(field("b").exists(true))?), vec!["2", "3"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_dotted_paths_and_arrays() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let by_owner = Document::from_json(r#"{"meta.owner": "ops"}"#)?;
            assert_eq!(ids(&collection.find(by_owner)?), vec!["irex-core", "irex-web"]);
            assert_eq!(
                ids(&collection.find(doc! { meta: { owner: "dev", downloads: 300 } })?),
                vec!["irex-cli"]
            );

            // a scalar matches an array holding it
            assert_eq!(ids(&collection.find(doc! { tags: "json" })?), vec!["irex-core", "irex-web"]);
            assert_eq!(ids(&collection.find(doc! { tags: ["cli"] })?), vec!["irex-cli"]);
            assert_eq!(ids(&collection.find(field("tags").size(2))?), vec!["irex-core", "irex-web"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_comparison_operators() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_eq!(ids(&collection.find(doc! { version: { "$gt": 2 } })?), vec!["irex-core", "irex-web"]);
            assert_eq!(ids(&collection.find(doc! { version: { "$gte": 1, "$lt": 3 } })?), vec!["irex-cli", "irex-web"]);
            assert_eq!(ids(&collection.find(doc! { version: { "$lte": 1 } })?), vec!["irex-cli"]);
            assert_eq!(ids(&collection.find(doc! { version: { "$eq": 3.0 } })?), vec!["irex-core"]);
            assert_eq!(ids(&collection.find(doc! { kind: { "$ne": "lib" } })?), vec!["irex-cli"]);

            let downloads = field("meta.downloads").between(100, 2000);
            assert_eq!(ids(&collection.find(downloads)?), vec!["irex-core", "irex-cli"]);

            // strings never compare with numbers
            assert!(collection.find(doc! { name: { "$gt": 1 } })?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_membership_exists_and_regex() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_eq!(ids(&collection.find(doc! { kind: { "$in": ["bin", "app"] } })?), vec!["irex-cli"]);
            assert_eq!(ids(&collection.find(doc! { kind: { "$nin": ["bin"] } })?), vec!["irex-core", "irex-web"]);
            assert!(collection.find(doc! { license: { "$exists": true } })?.is_empty());
            assert_eq!(collection.count(doc! { license: { "$exists": false } })?, 3);
            assert_eq!(ids(&collection.find(doc! { name: { "$regex": "-(cli|web)$" } })?), vec!["irex-cli", "irex-web"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_logical_operators() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let either = doc! { "$or": [{ kind: "bin" }, { version: { "$gt": 2.5 } }] };
            assert_eq!(ids(&collection.find(either)?), vec!["irex-core", "irex-cli"]);

            let both = doc! { "$and": [{ kind: "lib" }, { tags: "http" }] };
            assert_eq!(ids(&collection.find(both)?), vec!["irex-web"]);

            assert_eq!(ids(&collection.find(doc! { "$not": { kind: "lib" } })?), vec!["irex-cli"]);

            let neither = doc! { "$nor": [{ kind: "bin" }, { tags: "http" }] };
            assert_eq!(ids(&collection.find(neither)?), vec!["irex-core"]);

            let built = or(vec![
                and(vec![field("kind").eq("lib"), not(field("tags").eq("http"))]),
                nor(vec![field("kind").eq("lib")]),
            ]);
            assert_eq!(ids(&collection.find(built)?), vec!["irex-core", "irex-cli"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_elem_match() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.insert(doc! {
                "_id": "app",
                deps: [{ name: "serde", major: 1 }, { name: "log", major: 0 }],
                scores: [2, 12],
            })?;
            collection.insert(doc! {
                "_id": "tool",
                deps: [{ name: "serde", major: 0 }],
                scores: [7],
            })?;

            let serde_one = doc! { deps: { "$elemMatch": { name: "serde", major: { "$gte": 1 } } } };
            assert_eq!(ids(&collection.find(serde_one)?), vec!["app"]);

            // one element must satisfy both bounds
            let in_range = doc! { scores: { "$elemMatch": { "$gt": 5, "$lt": 10 } } };
            assert_eq!(ids(&collection.find(in_range)?), vec!["tool"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_options() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;
            collection.insert(doc! { "_id": "irex-old", name: "irex-old", kind: "lib" })?;

            let sorted = collection.find_with_options(all(), order_by("version", SortOrder::Descending))?;
            assert_eq!(ids(&sorted), vec!["irex-core", "irex-web", "irex-cli", "irex-old"]);

            // missing fields sort first
            let sorted = collection.find_with_options(all(), order_by("version", SortOrder::Ascending))?;
            assert_eq!(ids(&sorted), vec!["irex-old", "irex-cli", "irex-web", "irex-core"]);

            let options = FindOptions::new()
                .sort_by("kind", SortOrder::Ascending)
                .sort_by("name", SortOrder::Descending)
                .skip(1)
                .limit(2);
            let page = collection.find_with_options(all(), options)?;
            assert_eq!(ids(&page), vec!["irex-web", "irex-old"]);

            // without a sort the insertion order holds
            let page = collection.find_with_options(doc! { kind: "lib" }, FindOptions::new().limit(2))?;
            assert_eq!(ids(&page), vec!["irex-core", "irex-web"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_repeated_queries_see_fresh_results() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let query = doc! { kind: "lib" };
            assert_eq!(collection.count(query.clone())?, 2);
            assert_eq!(collection.count(query.clone())?, 2);

            collection.insert(doc! { "_id": "irex-extra", kind: "lib" })?;
            assert_eq!(collection.count(query.clone())?, 3);

            collection.update(doc! { "_id": "irex-core" }, doc! { kind: "bin" })?;
            assert_eq!(ids(&collection.find(query)?), vec!["irex-web", "irex-extra"]);
            Ok(())
        },
        cleanup,
    )
}
