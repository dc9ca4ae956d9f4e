//! Configuration management for an irexdb database.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::common::{
    atomic, Atomic, ReadExecutor, WriteExecutor, DEFAULT_COMPACTION_THRESHOLD,
    DEFAULT_CORRUPT_THRESHOLD, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_QUERY_CACHE_CAPACITY,
};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use crate::store::{AppendLogStore, InMemoryStore, SnapshotStore, Store, StoreProvider};

/// How collections are kept on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Nothing touches disk.
    InMemory,
    /// Every flush rewrites the whole datafile.
    Snapshot,
    /// Flushes append changes; the datafile is compacted periodically.
    AppendLog,
}

/// When pending changes of a collection are written to its datafile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Every mutation flushes before it returns.
    Immediate,
    /// A background task flushes dirty collections at this interval.
    Interval(Duration),
    /// Only `save()` and closing the database flush.
    Manual,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::Interval(Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS))
    }
}

/// Settings of a [Database](crate::database::Database).
///
/// Built through [DatabaseBuilder](crate::database_builder::DatabaseBuilder)
/// and frozen once the database opens. Clones share the same settings.
///
/// # Examples
///
/// ```rust,ignore
/// use irexdb::database_builder::DatabaseBuilder;
/// use irexdb::database_config::FlushPolicy;
///
/// let db = DatabaseBuilder::new()
///     .path("/var/lib/catalog")
///     .flush_policy(FlushPolicy::Immediate)
///     .open()?;
/// assert_eq!(db.config().flush_policy(), FlushPolicy::Immediate);
/// ```
#[derive(Clone)]
pub struct DatabaseConfig {
    inner: Arc<DatabaseConfigInner>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        DatabaseConfig {
            inner: Arc::new(DatabaseConfigInner::new()),
        }
    }

    /// Directory holding the datafiles, if any.
    pub fn path(&self) -> Option<PathBuf> {
        self.inner.path.get().cloned()
    }

    /// The configured mode, or `AppendLog` when a path is set and `InMemory` otherwise.
    pub fn persistence_mode(&self) -> PersistenceMode {
        self.inner.settings.read_with(|it| it.persistence_mode).unwrap_or_else(|| {
            if self.inner.path.get().is_some() {
                PersistenceMode::AppendLog
            } else {
                PersistenceMode::InMemory
            }
        })
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.inner.settings.read_with(|it| it.flush_policy)
    }

    pub fn timestamps(&self) -> bool {
        self.inner.settings.read_with(|it| it.timestamps)
    }

    pub fn query_cache_capacity(&self) -> usize {
        self.inner.settings.read_with(|it| it.query_cache_capacity)
    }

    pub fn corrupt_threshold(&self) -> f64 {
        self.inner.settings.read_with(|it| it.corrupt_threshold)
    }

    pub fn compaction_threshold(&self) -> usize {
        self.inner.settings.read_with(|it| it.compaction_threshold)
    }

    pub(crate) fn set_path(&self, path: &Path) -> IrexResult<()> {
        self.inner.ensure_not_configured("path")?;
        if path.as_os_str().is_empty() {
            log::error!("Database path cannot be empty");
            return Err(IrexError::new(
                "Database path cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }
        if self.inner.path.set(path.to_path_buf()).is_err() {
            log::error!("Database path can only be set once");
            return Err(IrexError::new(
                "Database path can only be set once",
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    pub(crate) fn set_persistence_mode(&self, mode: PersistenceMode) -> IrexResult<()> {
        self.inner.ensure_not_configured("persistence mode")?;
        self.inner.settings.write_with(|it| it.persistence_mode = Some(mode));
        Ok(())
    }

    pub(crate) fn set_flush_policy(&self, policy: FlushPolicy) -> IrexResult<()> {
        self.inner.ensure_not_configured("flush policy")?;
        if let FlushPolicy::Interval(interval) = policy {
            if interval.is_zero() {
                log::error!("Flush interval must be greater than zero");
                return Err(IrexError::new(
                    "Flush interval must be greater than zero",
                    ErrorKind::InvalidOperation,
                ));
            }
        }
        self.inner.settings.write_with(|it| it.flush_policy = policy);
        Ok(())
    }

    pub(crate) fn set_timestamps(&self, enabled: bool) -> IrexResult<()> {
        self.inner.ensure_not_configured("timestamps")?;
        self.inner.settings.write_with(|it| it.timestamps = enabled);
        Ok(())
    }

    pub(crate) fn set_query_cache_capacity(&self, capacity: usize) -> IrexResult<()> {
        self.inner.ensure_not_configured("query cache capacity")?;
        self.inner.settings.write_with(|it| it.query_cache_capacity = capacity);
        Ok(())
    }

    pub(crate) fn set_corrupt_threshold(&self, threshold: f64) -> IrexResult<()> {
        self.inner.ensure_not_configured("corrupt threshold")?;
        if !(0.0..=1.0).contains(&threshold) {
            log::error!("Corrupt threshold {} is not within 0.0 and 1.0", threshold);
            return Err(IrexError::new(
                &format!("Corrupt threshold {} is not within 0.0 and 1.0", threshold),
                ErrorKind::InvalidOperation,
            ));
        }
        self.inner.settings.write_with(|it| it.corrupt_threshold = threshold);
        Ok(())
    }

    pub(crate) fn set_compaction_threshold(&self, threshold: usize) -> IrexResult<()> {
        self.inner.ensure_not_configured("compaction threshold")?;
        if threshold == 0 {
            log::error!("Compaction threshold must be greater than zero");
            return Err(IrexError::new(
                "Compaction threshold must be greater than zero",
                ErrorKind::InvalidOperation,
            ));
        }
        self.inner.settings.write_with(|it| it.compaction_threshold = threshold);
        Ok(())
    }

    pub(crate) fn set_store_provider<T: StoreProvider + 'static>(&self, provider: T) -> IrexResult<()> {
        self.inner.ensure_not_configured("store provider")?;
        if self.inner.custom_store.set(Store::new(provider)).is_err() {
            log::error!("Store provider can only be set once");
            return Err(IrexError::new(
                "Store provider can only be set once",
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    /// Freezes the settings and creates the store they describe.
    pub(crate) fn initialize(&self) -> IrexResult<Store> {
        if self.inner.configured.swap(true, Ordering::Relaxed) {
            log::error!("Database configuration is already in use");
            return Err(IrexError::new(
                "Database configuration is already in use",
                ErrorKind::InvalidOperation,
            ));
        }

        if let Some(store) = self.inner.custom_store.get() {
            return Ok(store.clone());
        }

        let mode = self.persistence_mode();
        let path = match (mode, self.path()) {
            (PersistenceMode::InMemory, _) => return Ok(Store::new(InMemoryStore::new())),
            (_, Some(path)) => path,
            (_, None) => {
                log::error!("Persistence mode {:?} needs a database path", mode);
                return Err(IrexError::new(
                    &format!("Persistence mode {:?} needs a database path", mode),
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        std::fs::create_dir_all(&path).map_err(|e| {
            log::error!("Failed to create database directory {}: {}", path.display(), e);
            IrexError::new_with_cause(
                &format!("Failed to create database directory {}", path.display()),
                ErrorKind::Persistence,
                e.into(),
            )
        })?;

        let store = match mode {
            PersistenceMode::Snapshot => Store::new(SnapshotStore::new(path, self.corrupt_threshold())),
            _ => Store::new(AppendLogStore::new(
                path,
                self.corrupt_threshold(),
                self.compaction_threshold(),
            )),
        };
        Ok(store)
    }
}

struct DatabaseConfigInner {
    configured: AtomicBool,
    path: OnceLock<PathBuf>,
    custom_store: OnceLock<Store>,
    settings: Atomic<Settings>,
}

#[derive(Debug, Clone)]
struct Settings {
    persistence_mode: Option<PersistenceMode>,
    flush_policy: FlushPolicy,
    timestamps: bool,
    query_cache_capacity: usize,
    corrupt_threshold: f64,
    compaction_threshold: usize,
}

impl DatabaseConfigInner {
    fn new() -> Self {
        DatabaseConfigInner {
            configured: AtomicBool::from(false),
            path: OnceLock::new(),
            custom_store: OnceLock::new(),
            settings: atomic(Settings {
                persistence_mode: None,
                flush_policy: FlushPolicy::default(),
                timestamps: false,
                query_cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
                corrupt_threshold: DEFAULT_CORRUPT_THRESHOLD,
                compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            }),
        }
    }

    fn ensure_not_configured(&self, setting: &str) -> IrexResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("The {} cannot be changed after the database opened", setting);
            return Err(IrexError::new(
                &format!("The {} cannot be changed after the database opened", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}
