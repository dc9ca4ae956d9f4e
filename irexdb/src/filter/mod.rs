//! Query predicates.
//!
//! A query is either a partial document, parsed by [parse_query] into a tree
//! of filters, or a [Filter] built programmatically with [field] and the
//! logical helpers. Both reach a collection through [IntoFilter].
//!
//! ```rust,ignore
//! use irexdb::doc;
//! use irexdb::filter::field;
//!
//! let by_doc = collection.find(doc! { version: { "$gte": 2 }, name: "irex" })?;
//! let by_filter = collection.find(field("version").gte(2).and(field("name").eq("irex")))?;
//! ```

mod basic_filters;
mod filter;
mod fluent;
mod logical_filters;
mod pattern_filters;
mod query_parser;
mod range_filters;

pub use basic_filters::*;
pub use filter::*;
pub use fluent::*;
pub use logical_filters::*;
pub use pattern_filters::*;
pub use query_parser::*;
pub use range_filters::*;
