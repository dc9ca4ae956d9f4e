use crate::collection::Document;
use crate::common::current_time_millis;
use crate::errors::IrexResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

/// Kind of change a collection event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvents {
    Insert,
    Update,
    Remove,
}

/// A change published to collection subscribers after the in-memory mutation succeeded.
///
/// `item` is a copy of the affected document: the inserted document, the
/// document after an update, or the document as it was before removal.
#[derive(Clone)]
pub struct CollectionEventInfo {
    inner: Arc<CollectionEventInner>,
}

impl CollectionEventInfo {
    pub fn new(item: Document, event_type: CollectionEvents, collection: String) -> Self {
        CollectionEventInfo {
            inner: Arc::new(CollectionEventInner {
                item,
                event_type,
                collection,
                timestamp: current_time_millis(),
            }),
        }
    }

    pub fn event_type(&self) -> CollectionEvents {
        self.inner.event_type
    }

    pub fn item(&self) -> Document {
        self.inner.item.clone()
    }

    /// Name of the collection the change happened in.
    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn timestamp(&self) -> i64 {
        self.inner.timestamp
    }
}

impl Debug for CollectionEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventInfo")
            .field("item", &self.inner.item)
            .field("event_type", &self.inner.event_type)
            .field("collection", &self.inner.collection)
            .field("timestamp", &self.inner.timestamp)
            .finish()
    }
}

struct CollectionEventInner {
    item: Document,
    event_type: CollectionEvents,
    collection: String,
    timestamp: i64,
}

pub trait CollectionEventCallback: Send + Sync + Fn(CollectionEventInfo) -> IrexResult<()> {}

impl<F> CollectionEventCallback for F where
    F: Send + Sync + Fn(CollectionEventInfo) -> IrexResult<()>
{
}

/// Subscriber to a collection's change events.
#[derive(Clone)]
pub struct CollectionEventListener {
    on_event: Arc<dyn CollectionEventCallback>,
}

impl CollectionEventListener {
    pub fn new(on_event: impl CollectionEventCallback + 'static) -> Self {
        CollectionEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<CollectionEventInfo> for CollectionEventListener {
    fn handle(&self, event: &Event<CollectionEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for CollectionEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventListener").finish()
    }
}
