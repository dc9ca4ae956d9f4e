use crate::collection::Document;
use crate::errors::IrexResult;
use std::ops::Deref;
use std::sync::Arc;

/// One pending change of a collection, in the order it was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRecord {
    /// The full new content of an inserted or updated document.
    Put(Arc<Document>),
    /// The id of a removed document.
    Delete(String),
}

/// Backend a collection persists through.
///
/// `flush` receives the records accumulated since the previous successful
/// flush together with the complete current content of the collection, so a
/// provider may either append the records or rewrite everything.
pub trait StoreProvider: Send + Sync {
    /// Loads a collection's documents in insertion order.
    fn load(&self, collection: &str) -> IrexResult<Vec<Document>>;

    /// Persists `records`. `documents` is the collection content they lead to.
    fn flush(
        &self,
        collection: &str,
        records: &[StoreRecord],
        documents: &[Arc<Document>],
    ) -> IrexResult<()>;

    /// Whether the provider writes to disk at all.
    fn is_persistent(&self) -> bool;

    /// Short name used in log lines.
    fn store_name(&self) -> &'static str;
}

/// Shared handle to a [StoreProvider].
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StoreProvider>,
}

impl Store {
    pub fn new<T: StoreProvider + 'static>(inner: T) -> Self {
        Store {
            inner: Arc::new(inner),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("store_name", &self.inner.store_name())
            .finish()
    }
}

impl Deref for Store {
    type Target = Arc<dyn StoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
