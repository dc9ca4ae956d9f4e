use crate::collection::{CollectionOptions, DocumentStore};
use crate::common::{Scheduler, IREXDB_VERSION};
use crate::database_builder::DatabaseBuilder;
use crate::database_config::{DatabaseConfig, FlushPolicy};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use crate::store::Store;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Registry = Arc<DashMap<String, DocumentStore>>;

/// An embedded document database: a registry of named collections sharing
/// one store and one flush schedule.
///
/// Collections are created on first use and loaded from their datafile at
/// that moment. With an interval [FlushPolicy], a background task writes
/// dirty collections periodically.
///
/// `Database` is cheap to clone; all clones share the same state. Closing
/// the database, or dropping its last handle, flushes every collection.
/// Changes not yet flushed when the process dies abnormally are lost.
///
/// # Examples
///
/// ```rust,ignore
/// use irexdb::database::Database;
/// use irexdb::doc;
///
/// let db = Database::builder().path("/var/lib/catalog").open()?;
/// let pkgs = db.collection("pkgs")?;
/// pkgs.insert(doc! { "_id": "a", x: 1 })?;
/// db.close()?;
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn open(config: DatabaseConfig) -> IrexResult<Database> {
        let store = config.initialize()?;
        let inner = DatabaseInner {
            config,
            store,
            collections: Arc::new(DashMap::new()),
            scheduler: Scheduler::new(),
            closed: AtomicBool::new(false),
        };
        inner.schedule_flush();

        log::debug!(
            "Opened irexdb {} with {} store, flush policy {:?}",
            IREXDB_VERSION,
            inner.store.store_name(),
            inner.config.flush_policy()
        );
        Ok(Database {
            inner: Arc::new(inner),
        })
    }

    /// Gets a collection by name, loading it from its datafile on first use.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the database is closed or the name is
    /// empty, contains a path separator, or starts with `.`. Returns
    /// `Persistence` if the datafile cannot be read or is too corrupt.
    pub fn collection(&self, name: &str) -> IrexResult<DocumentStore> {
        self.inner.collection(name)
    }

    /// Whether `name` has been opened in this database.
    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.collections.contains_key(name)
    }

    pub fn list_collection_names(&self) -> HashSet<String> {
        self.inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Flushes every collection with pending changes.
    ///
    /// All collections are attempted; the first failure is returned.
    pub fn save(&self) -> IrexResult<()> {
        self.inner.check_opened()?;
        self.inner.save()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner
            .collections
            .iter()
            .any(|entry| entry.value().is_dirty())
    }

    /// Stops the flush schedule and flushes and closes every collection.
    ///
    /// Closing twice is a no-op. When a flush fails the database stays open
    /// with the failing collections registered and their changes pending,
    /// so `close` or `save` can be called again.
    pub fn close(&self) -> IrexResult<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> DatabaseConfig {
        self.inner.config.clone()
    }

    pub fn store(&self) -> Store {
        self.inner.store.clone()
    }
}

struct DatabaseInner {
    config: DatabaseConfig,
    store: Store,
    collections: Registry,
    scheduler: Scheduler,
    closed: AtomicBool,
}

impl DatabaseInner {
    fn collection(&self, name: &str) -> IrexResult<DocumentStore> {
        self.check_opened()?;
        validate_collection_name(name)?;

        if let Some(collection) = self.collections.get(name) {
            return Ok(collection.value().clone());
        }

        let entry = self.collections.entry(name.to_string()).or_try_insert_with(|| {
            DocumentStore::open(name, self.store.clone(), self.collection_options())
        })?;
        Ok(entry.value().clone())
    }

    fn collection_options(&self) -> CollectionOptions {
        CollectionOptions {
            flush_policy: self.config.flush_policy(),
            timestamps: self.config.timestamps(),
            query_cache_capacity: self.config.query_cache_capacity(),
        }
    }

    fn schedule_flush(&self) {
        if let FlushPolicy::Interval(interval) = self.config.flush_policy() {
            // the task only sees the registry so it never keeps the database alive
            let collections = self.collections.clone();
            self.scheduler.schedule(interval, move || {
                if let Err(e) = flush_dirty(&collections) {
                    log::warn!("Scheduled flush failed, retrying on next tick: {}", e);
                }
            });
        }
    }

    fn save(&self) -> IrexResult<()> {
        flush_dirty(&self.collections)
    }

    fn close(&self) -> IrexResult<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        self.scheduler.stop();

        let mut first_error = None;
        for collection in snapshot(&self.collections) {
            match collection.close() {
                Ok(()) => {
                    self.collections.remove(collection.name());
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => {
                log::error!(
                    "Failed to close database, {} collection(s) keep unsaved changes",
                    self.collections.len()
                );
                self.closed.store(false, Ordering::Relaxed);
                self.schedule_flush();
                Err(e)
            }
            None => {
                log::debug!("Closed database");
                Ok(())
            }
        }
    }

    fn check_opened(&self) -> IrexResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Database is closed");
            return Err(IrexError::new(
                "Database is closed",
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

// Flushes on drop of the last handle; `Drop` on `Database` would run for every clone.
impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        self.scheduler.stop();
        for collection in snapshot(&self.collections) {
            if let Err(e) = collection.flush() {
                log::warn!(
                    "Failed to flush collection {} on drop, unsaved changes are lost: {}",
                    collection.name(),
                    e
                );
            }
        }
    }
}

/// Clones out the registered collections so no shard lock is held during I/O.
fn snapshot(collections: &Registry) -> Vec<DocumentStore> {
    collections.iter().map(|entry| entry.value().clone()).collect()
}

fn flush_dirty(collections: &Registry) -> IrexResult<()> {
    let mut first_error = None;
    for collection in snapshot(collections) {
        if collection.is_closed() || !collection.is_dirty() {
            continue;
        }
        if let Err(e) = collection.flush() {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn validate_collection_name(name: &str) -> IrexResult<()> {
    if name.is_empty() {
        log::error!("Collection name cannot be empty");
        return Err(IrexError::new(
            "Collection name cannot be empty",
            ErrorKind::InvalidOperation,
        ));
    }

    if name.contains(['/', '\\', '\0']) {
        log::error!("Collection name {} cannot contain a path separator", name);
        return Err(IrexError::new(
            &format!("Collection name {} cannot contain a path separator", name),
            ErrorKind::InvalidOperation,
        ));
    }

    if name.starts_with('.') {
        log::error!("Collection name {} cannot start with '.'", name);
        return Err(IrexError::new(
            &format!("Collection name {} cannot start with '.'", name),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(())
}
