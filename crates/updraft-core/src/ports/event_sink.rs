//! Update event sink port.
//!
//! The engine emits [`UpdateEvent`]s without coupling to how the host
//! receives them. Delivery must be serialized with respect to other
//! deliveries; no particular thread affinity is required.

use tokio::sync::mpsc;

use crate::update::UpdateEvent;

/// Port for delivering update events to the host.
pub trait UpdateEventSink: Send + Sync {
    /// Deliver one event.
    ///
    /// Must not block the caller. Implementations with no remaining
    /// listener silently drop the event (zero-or-more-listeners semantics).
    fn emit(&self, event: UpdateEvent);

    /// Clone this sink into a boxed trait object.
    ///
    /// This enables cloning of `Arc<dyn UpdateEventSink>` without requiring
    /// the underlying type to implement `Clone`.
    fn clone_box(&self) -> Box<dyn UpdateEventSink>;
}

/// A no-op sink for tests and contexts that poll state instead.
#[derive(Debug, Clone, Default)]
pub struct NoopEventSink;

impl NoopEventSink {
    /// Create a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl UpdateEventSink for NoopEventSink {
    fn emit(&self, _event: UpdateEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn UpdateEventSink> {
        Box::new(self.clone())
    }
}

/// Channel-backed sink: events are pushed into an unbounded channel whose
/// receiver is the single consumer.
///
/// Any thread may emit; only the receiver side dequeues, which is what
/// keeps observed event order identical to emission order. Dropping the
/// receiver turns the sink into a no-op.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl ChannelEventSink {
    /// Create a sink together with the receiving end the host consumes.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UpdateEventSink for ChannelEventSink {
    fn emit(&self, event: UpdateEvent) {
        // A closed channel means the consumer went away; events are dropped.
        let _ = self.tx.send(event);
    }

    fn clone_box(&self) -> Box<dyn UpdateEventSink> {
        Box::new(self.clone())
    }
}
