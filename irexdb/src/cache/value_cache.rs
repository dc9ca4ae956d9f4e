use crate::common::{current_runtime, spawn_callback};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

type UpdateFn<T> = Box<dyn Fn() -> BoxFuture<'static, IrexResult<T>> + Send + Sync>;
type Refresh<T> = Shared<BoxFuture<'static, IrexResult<T>>>;

/// Memoizes the result of an async update function for a fixed lifetime.
///
/// A cached value is fresh until `lifetime` has passed since it was computed.
/// Reading a stale cache starts a refresh; callers arriving while it runs
/// wait for the same refresh instead of starting their own, so the update
/// function never runs twice concurrently.
///
/// A failed refresh is reported to every caller waiting on it as
/// `ValueCacheRefresh`. The previous value is kept for
/// [ValueCache::get_value_stale] and the next [ValueCache::get_value] retries.
///
/// # Examples
///
/// ```rust,ignore
/// let cache = ValueCache::new(Duration::from_secs(30), move || {
///     let pkgs = pkgs.clone();
///     async move { pkgs.count(doc! { kind: "lib" }) }
/// });
///
/// let libs = cache.get_value().await?;
/// ```
pub struct ValueCache<T> {
    inner: Arc<ValueCacheInner<T>>,
}

impl<T> Clone for ValueCache<T> {
    fn clone(&self) -> Self {
        ValueCache {
            inner: self.inner.clone(),
        }
    }
}

struct ValueCacheInner<T> {
    lifetime: Duration,
    update: UpdateFn<T>,
    state: Mutex<CacheState<T>>,
}

struct CacheState<T> {
    value: Option<T>,
    refreshed_at: Option<Instant>,
    refresh: Option<Refresh<T>>,
}

impl<T> ValueCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(lifetime: Duration, update: F) -> ValueCache<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IrexResult<T>> + Send + 'static,
    {
        ValueCache {
            inner: Arc::new(ValueCacheInner {
                lifetime,
                update: Box::new(move || update().boxed()),
                state: Mutex::new(CacheState {
                    value: None,
                    refreshed_at: None,
                    refresh: None,
                }),
            }),
        }
    }

    /// The cached value if fresh, otherwise the result of a refresh.
    pub async fn get_value(&self) -> IrexResult<T> {
        let refresh = {
            let mut state = self.inner.state.lock();
            if self.inner.is_fresh(&state) {
                if let Some(value) = &state.value {
                    return Ok(value.clone());
                }
            }
            self.join_or_start_refresh(&mut state)
        };
        refresh.await
    }

    /// The last computed value, however old; refreshes only if there is none yet.
    pub async fn get_value_stale(&self) -> IrexResult<T> {
        let cached = self.inner.state.lock().value.clone();
        match cached {
            Some(value) => Ok(value),
            None => self.get_value().await,
        }
    }

    /// Calls `callback` with the outcome of [ValueCache::get_value] on a tokio task.
    pub fn get_value_with<F>(&self, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<T>) + Send + 'static,
    {
        let handle = current_runtime()?;
        let cache = self.clone();
        Ok(spawn_callback(&handle, async move { cache.get_value().await }, callback))
    }

    /// Calls `callback` with the outcome of [ValueCache::get_value_stale] on a tokio task.
    pub fn get_value_stale_with<F>(&self, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<T>) + Send + 'static,
    {
        let handle = current_runtime()?;
        let cache = self.clone();
        Ok(spawn_callback(&handle, async move { cache.get_value_stale().await }, callback))
    }

    /// Marks the cache stale. The last value stays available to [ValueCache::get_value_stale].
    pub fn invalidate(&self) {
        self.inner.state.lock().refreshed_at = None;
    }

    pub fn lifetime(&self) -> Duration {
        self.inner.lifetime
    }

    pub fn is_fresh(&self) -> bool {
        let state = self.inner.state.lock();
        self.inner.is_fresh(&state)
    }

    fn join_or_start_refresh(&self, state: &mut CacheState<T>) -> Refresh<T> {
        if let Some(refresh) = &state.refresh {
            return refresh.clone();
        }

        let pending = (self.inner.update)();
        let cache = Arc::downgrade(&self.inner);
        let refresh = async move {
            let result = pending.await;
            complete_refresh(&cache, result)
        }
        .boxed()
        .shared();

        state.refresh = Some(refresh.clone());
        refresh
    }
}

impl<T> ValueCacheInner<T> {
    fn is_fresh(&self, state: &CacheState<T>) -> bool {
        state.value.is_some()
            && state
                .refreshed_at
                .map(|at| at.elapsed() < self.lifetime)
                .unwrap_or(false)
    }
}

/// Records the outcome of a refresh and clears the in-flight marker.
fn complete_refresh<T: Clone>(cache: &Weak<ValueCacheInner<T>>, result: IrexResult<T>) -> IrexResult<T> {
    let result = result.map_err(|e| {
        log::error!("Failed to refresh cached value: {}", e);
        IrexError::new_with_cause(
            "Failed to refresh cached value",
            ErrorKind::ValueCacheRefresh,
            e,
        )
    });

    if let Some(inner) = cache.upgrade() {
        let mut state = inner.state.lock();
        state.refresh = None;
        if let Ok(value) = &result {
            state.value = Some(value.clone());
            state.refreshed_at = Some(Instant::now());
        }
    }
    result
}
