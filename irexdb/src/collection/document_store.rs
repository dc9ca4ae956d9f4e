use crate::cache::ValueCache;
use crate::collection::{
    CollectionEventInfo, CollectionEventListener, CollectionEvents, CollectionStats, Document,
    FindOptions, QueryCache,
};
use crate::common::{current_time_millis, EventBus, SubscriberRef, Value, CREATED_AT, DOC_ID, UPDATED_AT};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use crate::filter::{
    equality_constraints, id_equality, is_all_filter, resolve_field, Filter, IntoFilter,
};
use crate::store::{Store, StoreRecord};
use crate::database_config::FlushPolicy;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

/// Settings a collection inherits from its database.
#[derive(Debug, Clone)]
pub(crate) struct CollectionOptions {
    pub(crate) flush_policy: FlushPolicy,
    pub(crate) timestamps: bool,
    pub(crate) query_cache_capacity: usize,
}

/// A named, insertion-ordered set of documents keyed by `_id`.
///
/// Every operation works on the in-memory state and reads never touch disk.
/// Mutations are recorded as pending changes that reach the datafile
/// according to the database's [FlushPolicy]: right away, on the next
/// scheduler tick, or on an explicit [DocumentStore::save].
///
/// Documents handed out by [DocumentStore::find] and friends are copies; changing
/// them never changes the stored documents.
/// [DocumentStore::find_no_deep_copy] skips the copy and returns shared,
/// immutable references instead.
///
/// `DocumentStore` is a cheap handle; clones share the same collection.
///
/// ```rust,ignore
/// let pkgs = db.collection("pkgs")?;
/// pkgs.insert(doc! { "_id": "a", x: 1 })?;
/// let found = pkgs.find(doc! { x: 1 })?;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

struct DocumentStoreInner {
    name: String,
    store: Store,
    options: CollectionOptions,
    state: RwLock<CollectionState>,
    flush_lock: Mutex<()>,
    query_cache: QueryCache,
    event_bus: EventBus<CollectionEventInfo, CollectionEventListener>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("name", &self.inner.name)
            .finish()
    }
}

#[derive(Default)]
struct CollectionState {
    documents: IndexMap<String, Arc<Document>>,
    pending: Vec<StoreRecord>,
}

impl DocumentStore {
    /// Opens a collection, loading its documents from `store`.
    pub(crate) fn open(name: &str, store: Store, options: CollectionOptions) -> IrexResult<DocumentStore> {
        let loaded = store.load(name).map_err(|e| {
            log::error!("Failed to load collection {}: {}", name, e);
            match e.kind() {
                ErrorKind::Persistence => e,
                _ => IrexError::new_with_cause(
                    &format!("Failed to load collection {}", name),
                    ErrorKind::Persistence,
                    e,
                ),
            }
        })?;

        let mut documents = IndexMap::with_capacity(loaded.len());
        for doc in loaded {
            if let Some(id) = doc.id() {
                documents.insert(id.to_string(), Arc::new(doc));
            }
        }
        log::debug!(
            "Opened collection {} with {} documents from {} store",
            name,
            documents.len(),
            store.store_name()
        );

        Ok(DocumentStore {
            inner: Arc::new(DocumentStoreInner {
                name: name.to_string(),
                store,
                query_cache: QueryCache::new(options.query_cache_capacity),
                options,
                state: RwLock::new(CollectionState {
                    documents,
                    pending: Vec::new(),
                }),
                flush_lock: Mutex::new(()),
                event_bus: EventBus::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Inserts a document, generating its `_id` when absent.
    ///
    /// Fails with `DuplicateKey` if the id is already taken, leaving the
    /// collection unchanged. Returns a copy of the stored document.
    pub fn insert(&self, doc: Document) -> IrexResult<Document> {
        let mut inserted = self.apply_insert(vec![doc])?;
        self.persist_if_immediate()?;
        Ok(inserted.remove(0))
    }

    /// Inserts a batch of documents, all or nothing.
    ///
    /// A duplicate id against the collection or inside the batch fails the
    /// whole batch with `DuplicateKey`.
    pub fn insert_many(&self, docs: Vec<Document>) -> IrexResult<Vec<Document>> {
        let inserted = self.apply_insert(docs)?;
        self.persist_if_immediate()?;
        Ok(inserted)
    }

    /// Replaces the content of every matching document with `new_doc`,
    /// keeping each document's `_id`. Returns the number of documents replaced.
    pub fn update(&self, query: impl IntoFilter, new_doc: Document) -> IrexResult<usize> {
        let filter = query.into_filter()?;
        let count = self.apply_update(&filter, new_doc)?;
        if count > 0 {
            self.persist_if_immediate()?;
        }
        Ok(count)
    }

    /// Updates the single matching document, or inserts `doc` if none matches.
    ///
    /// An inserted document also receives the query's plain equality
    /// constraints, with `doc`'s own fields taking precedence. More than one
    /// match fails with `AmbiguousUpsert` and changes nothing.
    pub fn upsert(&self, query: impl IntoFilter, doc: Document) -> IrexResult<Document> {
        let filter = query.into_filter()?;
        let stored = self.apply_upsert(&filter, doc)?;
        self.persist_if_immediate()?;
        Ok(stored)
    }

    /// Removes every matching document and returns how many were removed.
    pub fn remove(&self, query: impl IntoFilter) -> IrexResult<usize> {
        let filter = query.into_filter()?;
        let count = self.apply_remove(&filter)?;
        if count > 0 {
            self.persist_if_immediate()?;
        }
        Ok(count)
    }

    /// Copies of all matching documents, in insertion order.
    pub fn find(&self, query: impl IntoFilter) -> IrexResult<Vec<Document>> {
        let filter = query.into_filter()?;
        let found = self.find_shared(&filter)?;
        Ok(found.iter().map(|doc| doc.as_ref().clone()).collect())
    }

    /// Like [DocumentStore::find], then sorted, skipped and limited per `options`.
    pub fn find_with_options(&self, query: impl IntoFilter, options: FindOptions) -> IrexResult<Vec<Document>> {
        let filter = query.into_filter()?;
        let mut found = self.find_shared(&filter)?;

        if !options.sort_by.is_empty() {
            found.sort_by(|a, b| compare_documents(a, b, &options));
        }

        let skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(found
            .iter()
            .skip(skip)
            .take(limit)
            .map(|doc| doc.as_ref().clone())
            .collect())
    }

    /// A copy of the first matching document, `None` when nothing matches.
    pub fn find_one(&self, query: impl IntoFilter) -> IrexResult<Option<Document>> {
        let filter = query.into_filter()?;
        let found = self.find_shared(&filter)?;
        Ok(found.first().map(|doc| doc.as_ref().clone()))
    }

    /// The stored documents themselves, shared and immutable.
    pub fn find_no_deep_copy(&self, query: impl IntoFilter) -> IrexResult<Vec<Arc<Document>>> {
        let filter = query.into_filter()?;
        self.find_shared(&filter)
    }

    pub fn count(&self, query: impl IntoFilter) -> IrexResult<usize> {
        let filter = query.into_filter()?;
        self.ensure_opened()?;
        let state = self.inner.state.read();
        Ok(self.matching_ids(&state, &filter)?.len())
    }

    pub fn size(&self) -> usize {
        self.inner.state.read().documents.len()
    }

    /// Writes pending changes to the datafile now, regardless of the flush policy.
    pub fn save(&self) -> IrexResult<()> {
        self.flush()
    }

    /// Whether changes are waiting to be written.
    pub fn is_dirty(&self) -> bool {
        !self.inner.state.read().pending.is_empty()
    }

    pub fn stats(&self) -> IrexResult<CollectionStats> {
        self.ensure_opened()?;
        let state = self.inner.state.read();
        Ok(CollectionStats::compute(state.documents.values().map(|doc| doc.as_ref())))
    }

    /// A [ValueCache] memoizing [DocumentStore::stats] for `lifetime`.
    pub fn stats_cache(&self, lifetime: Duration) -> ValueCache<CollectionStats> {
        let collection = self.clone();
        ValueCache::new(lifetime, move || {
            let collection = collection.clone();
            async move { collection.stats() }
        })
    }

    /// Subscribes to insert, update and remove events of this collection.
    pub fn subscribe(&self, listener: CollectionEventListener) -> IrexResult<SubscriberRef> {
        self.ensure_opened()?;
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> IrexResult<()> {
        self.ensure_opened()?;
        self.inner.event_bus.deregister(subscriber)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn flush_policy(&self) -> FlushPolicy {
        self.inner.options.flush_policy
    }

    /// Flushes pending changes, then rejects any further operation.
    ///
    /// A failed flush leaves the collection open.
    pub(crate) fn close(&self) -> IrexResult<()> {
        self.flush()?;
        self.inner.closed.store(true, AtomicOrdering::Relaxed);
        if let Err(e) = self.inner.event_bus.close() {
            log::warn!("Failed to close event bus of collection {}: {}", self.inner.name, e);
        }
        Ok(())
    }

    /// Writes pending records through the store.
    ///
    /// On failure the records go back in front of any newer ones so the
    /// next attempt writes everything in order.
    pub(crate) fn flush(&self) -> IrexResult<()> {
        let _flush_guard = self.inner.flush_lock.lock();
        let (records, documents) = {
            let mut state = self.inner.state.write();
            if state.pending.is_empty() {
                return Ok(());
            }
            let records = std::mem::take(&mut state.pending);
            let documents: Vec<Arc<Document>> = state.documents.values().cloned().collect();
            (records, documents)
        };

        match self.inner.store.flush(&self.inner.name, &records, &documents) {
            Ok(()) => {
                log::debug!(
                    "Flushed {} changes of collection {}",
                    records.len(),
                    self.inner.name
                );
                Ok(())
            }
            Err(e) => {
                let mut state = self.inner.state.write();
                let newer = std::mem::take(&mut state.pending);
                state.pending = records;
                state.pending.extend(newer);

                log::error!("Failed to flush collection {}: {}", self.inner.name, e);
                Err(IrexError::new_with_cause(
                    &format!("Failed to flush collection {}", self.inner.name),
                    ErrorKind::Persistence,
                    e,
                ))
            }
        }
    }

    pub(crate) fn persist_if_immediate(&self) -> IrexResult<()> {
        match self.inner.options.flush_policy {
            FlushPolicy::Immediate => self.flush(),
            _ => Ok(()),
        }
    }

    pub(crate) fn apply_insert(&self, docs: Vec<Document>) -> IrexResult<Vec<Document>> {
        self.ensure_opened()?;
        let now = current_time_millis();
        let mut prepared = Vec::with_capacity(docs.len());
        for mut doc in docs {
            validate_document(&doc)?;
            let id = doc.ensure_id()?;
            if self.inner.options.timestamps {
                doc.put_field(CREATED_AT.to_string(), Value::I64(now));
                doc.put_field(UPDATED_AT.to_string(), Value::I64(now));
            }
            prepared.push((id, Arc::new(doc)));
        }

        let mut events = Vec::with_capacity(prepared.len());
        {
            let mut state = self.inner.state.write();
            let mut batch_ids = HashSet::with_capacity(prepared.len());
            for (id, _) in prepared.iter() {
                if state.documents.contains_key(id) || !batch_ids.insert(id.as_str()) {
                    log::error!("Document already exists with id {} in {}", id, self.inner.name);
                    return Err(IrexError::new(
                        &format!("Document already exists with id {} in {}", id, self.inner.name),
                        ErrorKind::DuplicateKey,
                    ));
                }
            }

            for (id, doc) in prepared.iter() {
                state.documents.insert(id.clone(), doc.clone());
                self.record(&mut state, StoreRecord::Put(doc.clone()));
                events.push((CollectionEvents::Insert, doc.as_ref().clone()));
            }
            self.inner.query_cache.invalidate();
        }

        self.publish(&events);
        Ok(events.into_iter().map(|(_, doc)| doc).collect())
    }

    pub(crate) fn apply_update(&self, filter: &Filter, new_doc: Document) -> IrexResult<usize> {
        self.ensure_opened()?;
        validate_document(&new_doc)?;

        let mut events = Vec::new();
        {
            let mut state = self.inner.state.write();
            let ids = self.matching_ids(&state, filter)?;
            for id in ids.iter() {
                check_id_unchanged(&new_doc, id)?;
            }

            let now = current_time_millis();
            for id in ids.iter() {
                let replacement = self.replacement(&state, id, &new_doc, now);
                state.documents.insert(id.clone(), replacement.clone());
                self.record(&mut state, StoreRecord::Put(replacement.clone()));
                events.push((CollectionEvents::Update, replacement.as_ref().clone()));
            }

            if !ids.is_empty() {
                self.inner.query_cache.invalidate();
            }
        }

        self.publish(&events);
        Ok(events.len())
    }

    pub(crate) fn apply_upsert(&self, filter: &Filter, doc: Document) -> IrexResult<Document> {
        self.ensure_opened()?;
        validate_document(&doc)?;

        let updated = {
            let mut state = self.inner.state.write();
            let ids = self.matching_ids(&state, filter)?;
            match ids.len() {
                0 => None,
                1 => {
                    let id = &ids[0];
                    check_id_unchanged(&doc, id)?;
                    let replacement = self.replacement(&state, id, &doc, current_time_millis());
                    state.documents.insert(id.clone(), replacement.clone());
                    self.record(&mut state, StoreRecord::Put(replacement.clone()));
                    self.inner.query_cache.invalidate();
                    Some(replacement.as_ref().clone())
                }
                n => {
                    log::error!(
                        "Upsert query {} matched {} documents in {}",
                        filter,
                        n,
                        self.inner.name
                    );
                    return Err(IrexError::new(
                        &format!(
                            "Upsert query {} matched {} documents in {}",
                            filter, n, self.inner.name
                        ),
                        ErrorKind::AmbiguousUpsert,
                    ));
                }
            }
        };

        match updated {
            Some(stored) => {
                self.publish(&[(CollectionEvents::Update, stored.clone())]);
                Ok(stored)
            }
            None => {
                let mut merged = Document::new();
                for (field, value) in equality_constraints(filter) {
                    merged.put(&field, value)?;
                }
                merged.merge(&doc);

                // a concurrent insert of the same id surfaces as DuplicateKey here
                let mut inserted = self.apply_insert(vec![merged])?;
                Ok(inserted.remove(0))
            }
        }
    }

    pub(crate) fn apply_remove(&self, filter: &Filter) -> IrexResult<usize> {
        self.ensure_opened()?;

        let mut events = Vec::new();
        {
            let mut state = self.inner.state.write();
            let ids = self.matching_ids(&state, filter)?;
            if ids.is_empty() {
                return Ok(0);
            }

            let removed: HashSet<&String> = ids.iter().collect();
            for id in ids.iter() {
                if let Some(doc) = state.documents.get(id) {
                    events.push((CollectionEvents::Remove, doc.as_ref().clone()));
                }
            }
            state.documents.retain(|id, _| !removed.contains(id));
            for id in ids.iter() {
                self.record(&mut state, StoreRecord::Delete(id.clone()));
            }
            self.inner.query_cache.invalidate();
        }

        self.publish(&events);
        Ok(events.len())
    }

    fn find_shared(&self, filter: &Filter) -> IrexResult<Vec<Arc<Document>>> {
        self.ensure_opened()?;
        let state = self.inner.state.read();
        let ids = self.matching_ids(&state, filter)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.documents.get(id).cloned())
            .collect())
    }

    /// Ids of the matching documents in insertion order.
    ///
    /// The filter is validated before anything is scanned. `_id` equality
    /// goes straight to the id map; other queries go through the query cache.
    fn matching_ids(&self, state: &CollectionState, filter: &Filter) -> IrexResult<Arc<Vec<String>>> {
        filter.validate()?;

        if is_all_filter(filter) {
            return Ok(Arc::new(state.documents.keys().cloned().collect()));
        }

        if let Some(id) = id_equality(filter) {
            let ids = match state.documents.get(&id) {
                Some(_) => vec![id],
                None => Vec::new(),
            };
            return Ok(Arc::new(ids));
        }

        let key = filter.is_cacheable().then(|| filter.to_string());
        if let Some(ids) = key.as_ref().and_then(|key| self.inner.query_cache.get(key)) {
            return Ok(ids);
        }

        let mut ids = Vec::new();
        for (id, doc) in state.documents.iter() {
            if filter.apply(doc)? {
                ids.push(id.clone());
            }
        }

        let ids = Arc::new(ids);
        if let Some(key) = key {
            self.inner.query_cache.put(key, ids.clone());
        }
        Ok(ids)
    }

    /// The document that replaces `id`: `new_doc` with the id kept and timestamps refreshed.
    fn replacement(&self, state: &CollectionState, id: &str, new_doc: &Document, now: i64) -> Arc<Document> {
        let mut replacement = new_doc.clone();
        replacement.put_field(DOC_ID.to_string(), Value::from(id));

        if self.inner.options.timestamps {
            let created = state
                .documents
                .get(id)
                .and_then(|old| old.get(CREATED_AT).ok())
                .filter(|value| !value.is_null())
                .unwrap_or(Value::I64(now));
            replacement.put_field(CREATED_AT.to_string(), created);
            replacement.put_field(UPDATED_AT.to_string(), Value::I64(now));
        }
        Arc::new(replacement)
    }

    fn record(&self, state: &mut CollectionState, record: StoreRecord) {
        if self.inner.store.is_persistent() {
            state.pending.push(record);
        }
    }

    fn publish(&self, events: &[(CollectionEvents, Document)]) {
        if !self.inner.event_bus.has_listeners() {
            return;
        }

        for (event_type, doc) in events {
            let info = CollectionEventInfo::new(doc.clone(), *event_type, self.inner.name.clone());
            if let Err(e) = self.inner.event_bus.publish(info) {
                log::warn!("Collection {} listener failed: {}", self.inner.name, e);
            }
        }
    }

    fn ensure_opened(&self) -> IrexResult<()> {
        if self.is_closed() {
            log::error!("Collection {} is closed", self.inner.name);
            return Err(IrexError::new(
                &format!("Collection {} is closed", self.inner.name),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

/// Top-level `$` keys are reserved for query operators and datafile markers.
fn validate_document(doc: &Document) -> IrexResult<()> {
    if let Some(key) = doc.keys().find(|key| key.starts_with('$')) {
        log::error!("Document field {} must not start with $", key);
        return Err(IrexError::new(
            &format!("Document field {} must not start with $", key),
            ErrorKind::InvalidOperation,
        ));
    }
    if let Some((key, _)) = doc.iter().find(|(_, value)| !value.is_finite()) {
        log::error!("Document field {} holds a NaN or infinite number", key);
        return Err(IrexError::new(
            &format!("Document field {} holds a NaN or infinite number", key),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(())
}

fn check_id_unchanged(new_doc: &Document, id: &str) -> IrexResult<()> {
    if new_doc.has_id() && new_doc.id() != Some(id) {
        log::error!("Update cannot change _id of document {}", id);
        return Err(IrexError::new(
            &format!("Update cannot change _id of document {}", id),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(())
}

/// Missing sort fields order first, then the [Value] total order.
fn compare_documents(a: &Document, b: &Document, options: &FindOptions) -> Ordering {
    for (field, order) in options.sort_by.iter() {
        let ordering = match (resolve_field(a, field), resolve_field(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        };
        let ordering = order.apply(ordering);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
