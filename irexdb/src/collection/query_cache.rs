use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU map from a query's canonical text to the ids it matched.
///
/// Any mutation of the collection clears the whole cache. A capacity of 0
/// disables caching.
pub(crate) struct QueryCache {
    cache: Option<Mutex<LruCache<String, Arc<Vec<String>>>>>,
}

impl QueryCache {
    pub(crate) fn new(capacity: usize) -> Self {
        QueryCache {
            cache: NonZeroUsize::new(capacity).map(|c| Mutex::new(LruCache::new(c))),
        }
    }

    pub(crate) fn get(&self, query: &str) -> Option<Arc<Vec<String>>> {
        let cache = self.cache.as_ref()?;
        cache.lock().get(query).cloned()
    }

    pub(crate) fn put(&self, query: String, ids: Arc<Vec<String>>) {
        if let Some(cache) = &self.cache {
            cache.lock().put(query, ids);
        }
    }

    pub(crate) fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.as_ref().map(|c| c.lock().len()).unwrap_or(0)
    }
}
