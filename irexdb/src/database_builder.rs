use std::path::Path;

use crate::database::Database;
use crate::database_config::{DatabaseConfig, FlushPolicy, PersistenceMode};
use crate::errors::{IrexError, IrexResult};
use crate::store::StoreProvider;

/// Fluent builder for opening a [Database].
///
/// The first invalid setting is remembered and returned by [DatabaseBuilder::open];
/// later settings are then ignored.
///
/// # Examples
///
/// ```rust,ignore
/// use irexdb::database_builder::DatabaseBuilder;
/// use irexdb::database_config::{FlushPolicy, PersistenceMode};
///
/// // in-memory, nothing touches disk
/// let scratch = DatabaseBuilder::new().open()?;
///
/// let catalog = DatabaseBuilder::new()
///     .path("/var/lib/catalog")
///     .persistence_mode(PersistenceMode::Snapshot)
///     .flush_policy(FlushPolicy::Manual)
///     .timestamps(true)
///     .open()?;
/// ```
#[derive(Default)]
pub struct DatabaseBuilder {
    error: Option<IrexError>,
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder {
            error: None,
            config: DatabaseConfig::new(),
        }
    }

    /// Directory holding one datafile per collection. Created on open if missing.
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_path(path.as_ref()))
    }

    /// Defaults to [PersistenceMode::AppendLog] when a path is set.
    pub fn persistence_mode(self, mode: PersistenceMode) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_persistence_mode(mode))
    }

    /// Defaults to flushing dirty collections every second.
    pub fn flush_policy(self, policy: FlushPolicy) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_flush_policy(policy))
    }

    /// Stamps `createdAt` and `updatedAt` on stored documents.
    pub fn timestamps(self, enabled: bool) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_timestamps(enabled))
    }

    /// Entries kept per collection in the query-result cache; 0 disables it.
    pub fn query_cache_capacity(self, capacity: usize) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_query_cache_capacity(capacity))
    }

    /// Largest fraction of unreadable datafile lines a load tolerates.
    pub fn corrupt_threshold(self, threshold: f64) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_corrupt_threshold(threshold))
    }

    /// Appended records after which an append-log datafile is compacted.
    pub fn compaction_threshold(self, threshold: usize) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_compaction_threshold(threshold))
    }

    /// Replaces the file-backed stores with a custom provider.
    ///
    /// Path and persistence mode are then ignored.
    pub fn store_provider<T: StoreProvider + 'static>(self, provider: T) -> Self {
        let config = self.config.clone();
        self.apply(move || config.set_store_provider(provider))
    }

    /// Opens the database, failing with the first configuration error if any.
    pub fn open(self) -> IrexResult<Database> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Database::open(self.config)
    }

    fn apply(mut self, setter: impl FnOnce() -> IrexResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = setter() {
                self.error = Some(e);
            }
        }
        self
    }
}
