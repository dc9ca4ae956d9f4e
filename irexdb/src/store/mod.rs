//! Persistence of collections to datafiles.
//!
//! Each collection is backed by one newline-delimited JSON datafile,
//! `<db_dir>/<collection>.db`. A [Store] handle wraps one of the providers:
//!
//! * [InMemoryStore] keeps nothing on disk.
//! * [SnapshotStore] rewrites the whole datafile on every flush.
//! * [AppendLogStore] appends changed documents and deletion markers,
//!   compacting the file once enough records have piled up.

mod append_log;
mod codec;
mod datafile;
mod memory;
mod snapshot;
mod store_provider;

pub use append_log::*;
pub use codec::*;
pub(crate) use datafile::*;
pub use memory::*;
pub use snapshot::*;
pub use store_provider::*;
