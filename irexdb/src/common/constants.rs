// document fields
pub const DOC_ID: &str = "_id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const FIELD_SEPARATOR: &str = ".";

// datafile
pub const DATAFILE_EXTENSION: &str = "db";
pub const DELETED_MARKER: &str = "$$deleted";

// events
pub const COLLECTION_EVENT: &str = "irexdb_collection_event";

// defaults
pub const DEFAULT_QUERY_CACHE_CAPACITY: usize = 64;
pub const DEFAULT_CORRUPT_THRESHOLD: f64 = 0.1;
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 1000;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

pub const IREXDB_VERSION: &str = env!("CARGO_PKG_VERSION");
