use crate::common::COLLECTION_EVENT;
use crate::errors::{ErrorKind, IrexError, IrexResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus as BasuEventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publish/subscribe channel for events of type `E` delivered to listeners of type `L`.
///
/// Cloning an `EventBus` yields another handle to the same subscriber list.
#[derive(Clone)]
pub struct EventBus<E, L> {
    inner: Arc<EventBusInner<E, L>>,
}

impl<E, L> Default for EventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> EventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        EventBus {
            inner: Arc::new(EventBusInner::new()),
        }
    }

    pub fn register(&self, listener: L) -> IrexResult<SubscriberRef> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> IrexResult<()> {
        self.inner.deregister(subscriber)
    }

    pub fn publish(&self, event: E) -> IrexResult<()> {
        self.inner.publish(event)
    }

    pub fn close(&self) -> IrexResult<()> {
        self.inner.close()
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

/// Handle returned by a subscription, used to unsubscribe.
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct EventBusInner<E, L> {
    event_bus: BasuEventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> EventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        EventBusInner {
            event_bus: BasuEventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> IrexResult<SubscriberRef> {
        self.event_bus
            .subscribe(COLLECTION_EVENT, Box::new(listener))
            .map(SubscriberRef::new)
            .map_err(Self::irex_error)
    }

    fn deregister(&self, subscriber: SubscriberRef) -> IrexResult<()> {
        self.event_bus
            .unsubscribe(COLLECTION_EVENT, &subscriber.inner)
            .map_err(Self::irex_error)
    }

    fn publish(&self, event: E) -> IrexResult<()> {
        // skip building the event when nobody listens
        if !self.has_listeners() {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(COLLECTION_EVENT, &basu_event)
            .map_err(Self::irex_error)
    }

    fn close(&self) -> IrexResult<()> {
        self.event_bus.clear().map_err(Self::irex_error)
    }

    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(COLLECTION_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    fn irex_error(e: BasuError) -> IrexError {
        match e {
            BasuError::EventTypeNotFOUND => IrexError::new(
                "Event bus error: no listener registered for collection events",
                ErrorKind::InvalidOperation,
            ),
            BasuError::MutexPoisoned => IrexError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::InternalError,
            ),
            BasuError::HandlerError(e) => IrexError::new(
                &format!("Event handler error: {}", e),
                ErrorKind::InternalError,
            ),
        }
    }
}
