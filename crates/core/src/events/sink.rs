//! Domain event sink trait and implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use log::error;
use tokio::sync::mpsc;

use super::DomainEvent;

/// Trait for receiving domain events.
///
/// Core services emit events through this trait after successful mutations.
///
/// # Design Rules
///
/// - `emit()` must be fast and non-blocking (no I/O, no recalculation inline)
/// - Failure to emit must not affect domain operations (best-effort)
pub trait DomainEventSink: Send + Sync {
    /// Emit a single domain event.
    fn emit(&self, event: DomainEvent);

    /// Emit multiple domain events.
    ///
    /// Default implementation calls `emit()` for each event.
    fn emit_batch(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// No-op implementation for contexts that don't need events.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Collects emitted events in memory. Useful for tests and audit trails.
#[derive(Clone, Default)]
pub struct CollectingDomainEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl CollectingDomainEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<DomainEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.guard().clone()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.guard().clear();
    }

    /// Returns the number of collected events.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Returns true if no events have been collected.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl DomainEventSink for CollectingDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        self.guard().push(event);
    }
}

/// Forwards events to an unbounded channel drained by
/// [`run_recalculation_worker`](super::run_recalculation_worker).
pub struct ChannelDomainEventSink {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelDomainEventSink {
    /// Creates the sink and the receiver the worker must consume.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DomainEventSink for ChannelDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.sender.send(event) {
            error!("Failed to send domain event to queue: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink_does_not_panic() {
        let sink = NoOpDomainEventSink;
        sink.emit(DomainEvent::assets_changed(vec!["cash".to_string()]));
        sink.emit_batch(vec![
            DomainEvent::goals_changed(vec!["a".to_string()]),
            DomainEvent::goals_changed(vec!["b".to_string()]),
        ]);
    }

    #[test]
    fn test_collecting_sink_collects_events() {
        let sink = CollectingDomainEventSink::new();
        assert!(sink.is_empty());

        sink.emit(DomainEvent::assets_changed(vec!["cash".to_string()]));
        assert_eq!(sink.len(), 1);

        sink.emit_batch(vec![
            DomainEvent::goals_changed(vec!["a".to_string()]),
            DomainEvent::goals_changed(vec!["b".to_string()]),
        ]);
        assert_eq!(sink.len(), 3);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelDomainEventSink::new();
        sink.emit(DomainEvent::goals_changed(vec!["a".to_string()]));
        assert_eq!(
            rx.recv().await,
            Some(DomainEvent::goals_changed(vec!["a".to_string()]))
        );
    }
}
