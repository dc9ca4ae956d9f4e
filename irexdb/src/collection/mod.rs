//! Documents and the collections that hold them.
//!
//! A [Document] is an ordered map from field names to [Value](crate::common::Value)s.
//! Nested fields are addressed with dotted paths, and numeric segments index
//! into arrays.
//!
//! ```rust,ignore
//! use irexdb::doc;
//!
//! let mut pkg = doc! { name: "irex", version: 2 };
//! pkg.put("meta.owner", "ops")?;
//! assert_eq!(pkg.get("meta.owner")?, irexdb::val!("ops"));
//! ```
//!
//! A [DocumentStore] is a named, insertion-ordered collection keyed by `_id`.
//! It is obtained from [Database::collection](crate::database::Database::collection)
//! and offers every mutation in three forms:
//!
//! - synchronous, returning [IrexResult](crate::errors::IrexResult);
//! - a future (`*_async`) whose in-memory change is applied at call time;
//! - a callback (`*_with`) invoked on a tokio task.
//!
//! # Reserved Fields
//!
//! - `_id` - document id, a non-empty string
//! - `createdAt` / `updatedAt` - epoch milliseconds, when timestamps are enabled
//! - top-level names starting with `$` are rejected

mod async_ops;
mod document;
mod document_store;
mod event;
mod find_options;
mod query_cache;
mod stats;

pub use document::*;
pub use document_store::*;
pub use event::*;
pub use find_options::*;
pub(crate) use query_cache::*;
pub use stats::*;
