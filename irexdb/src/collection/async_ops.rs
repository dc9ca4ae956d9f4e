use crate::collection::{Document, DocumentStore};
use crate::common::{current_runtime, spawn_callback};
use crate::database_config::FlushPolicy;
use crate::errors::IrexResult;
use crate::filter::IntoFilter;
use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;

// Future and callback forms of the mutating operations.
//
// The in-memory change is applied when the method is called, so changes land
// in call order no matter when the futures are polled. Only the flush, if the
// policy asks for one, is deferred into the future and runs on tokio's
// blocking pool. The futures must be polled inside a tokio runtime.
impl DocumentStore {
    pub fn insert_async(&self, doc: Document) -> BoxFuture<'static, IrexResult<Document>> {
        let applied = self.apply_insert(vec![doc]).map(|mut docs| docs.remove(0));
        self.complete_after_flush(applied)
    }

    pub fn insert_many_async(&self, docs: Vec<Document>) -> BoxFuture<'static, IrexResult<Vec<Document>>> {
        let applied = self.apply_insert(docs);
        self.complete_after_flush(applied)
    }

    pub fn update_async(&self, query: impl IntoFilter, new_doc: Document) -> BoxFuture<'static, IrexResult<usize>> {
        let applied = query
            .into_filter()
            .and_then(|filter| self.apply_update(&filter, new_doc));
        match applied {
            Ok(0) => futures::future::ready(Ok(0)).boxed(),
            _ => self.complete_after_flush(applied),
        }
    }

    pub fn upsert_async(&self, query: impl IntoFilter, doc: Document) -> BoxFuture<'static, IrexResult<Document>> {
        let applied = query
            .into_filter()
            .and_then(|filter| self.apply_upsert(&filter, doc));
        self.complete_after_flush(applied)
    }

    pub fn remove_async(&self, query: impl IntoFilter) -> BoxFuture<'static, IrexResult<usize>> {
        let applied = query
            .into_filter()
            .and_then(|filter| self.apply_remove(&filter));
        match applied {
            Ok(0) => futures::future::ready(Ok(0)).boxed(),
            _ => self.complete_after_flush(applied),
        }
    }

    /// Flushes pending changes on the blocking pool, regardless of the flush policy.
    pub fn save_async(&self) -> BoxFuture<'static, IrexResult<()>> {
        let collection = self.clone();
        async move { tokio::task::spawn_blocking(move || collection.flush()).await? }.boxed()
    }

    /// Calls `callback` with the outcome of [DocumentStore::insert_async] on a tokio task.
    ///
    /// Fails without touching the collection when called outside a tokio runtime.
    pub fn insert_with<F>(&self, doc: Document, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<Document>) + Send + 'static,
    {
        let handle = current_runtime()?;
        Ok(spawn_callback(&handle, self.insert_async(doc), callback))
    }

    pub fn update_with<F>(&self, query: impl IntoFilter, new_doc: Document, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<usize>) + Send + 'static,
    {
        let handle = current_runtime()?;
        Ok(spawn_callback(&handle, self.update_async(query, new_doc), callback))
    }

    pub fn upsert_with<F>(&self, query: impl IntoFilter, doc: Document, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<Document>) + Send + 'static,
    {
        let handle = current_runtime()?;
        Ok(spawn_callback(&handle, self.upsert_async(query, doc), callback))
    }

    pub fn remove_with<F>(&self, query: impl IntoFilter, callback: F) -> IrexResult<JoinHandle<()>>
    where
        F: FnOnce(IrexResult<usize>) + Send + 'static,
    {
        let handle = current_runtime()?;
        Ok(spawn_callback(&handle, self.remove_async(query), callback))
    }

    fn complete_after_flush<T: Send + 'static>(&self, applied: IrexResult<T>) -> BoxFuture<'static, IrexResult<T>> {
        let collection = self.clone();
        async move {
            let value = applied?;
            if let FlushPolicy::Immediate = collection.flush_policy() {
                tokio::task::spawn_blocking(move || collection.flush()).await??;
            }
            Ok(value)
        }
        .boxed()
    }
}
