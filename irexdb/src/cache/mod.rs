//! Time-bounded memoization of expensive async computations.
//!
//! [ValueCache] wraps an update function and serves its last result until the
//! configured lifetime passes. Collections use it for
//! [DocumentStore::stats_cache](crate::collection::DocumentStore::stats_cache).

mod value_cache;

pub use value_cache::*;
