//! Debounced recalculation worker.
//!
//! Receives events from an mpsc channel, coalesces bursts inside the
//! debounce window, then runs one recalculation for the batch. The pending
//! batch is always flushed when the channel closes, so the last trigger is
//! never dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::DomainEvent;
use crate::errors::Result;

/// Performs the recompute for a coalesced batch of triggers.
#[async_trait]
pub trait RecalculationHandler: Send + Sync {
    async fn handle_triggers(&self, triggers: &[DomainEvent]) -> Result<()>;
}

/// Runs until the sending side of `rx` is dropped.
pub async fn run_recalculation_worker(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    handler: Arc<dyn RecalculationHandler>,
    debounce: Duration,
) {
    info!("Recalculation worker started");

    let mut pending: Vec<DomainEvent> = Vec::new();

    loop {
        if pending.is_empty() {
            match rx.recv().await {
                Some(event) => push_trigger(&mut pending, event),
                None => break,
            }
            continue;
        }

        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(e) => push_trigger(&mut pending, e),
                    None => break,
                }
            }
            _ = tokio::time::sleep(debounce) => {
                let batch = std::mem::take(&mut pending);
                process_batch(&batch, handler.as_ref()).await;
            }
        }
    }

    if !pending.is_empty() {
        process_batch(&pending, handler.as_ref()).await;
    }
    info!("Recalculation worker shutting down");
}

fn push_trigger(pending: &mut Vec<DomainEvent>, event: DomainEvent) {
    if event.triggers_recalculation() {
        pending.push(event);
    } else {
        debug!("Ignoring non-trigger event {:?}", event);
    }
}

async fn process_batch(batch: &[DomainEvent], handler: &dyn RecalculationHandler) {
    debug!("Recalculating after {} coalesced trigger(s)", batch.len());
    if let Err(e) = handler.handle_triggers(batch).await {
        warn!("Recalculation failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelDomainEventSink, DomainEventSink};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RecalculationHandler for RecordingHandler {
        async fn handle_triggers(&self, triggers: &[DomainEvent]) -> Result<()> {
            self.batches.lock().unwrap().push(triggers.len());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_and_flushed_on_close() {
        let (sink, rx) = ChannelDomainEventSink::new();
        let handler = Arc::new(RecordingHandler::default());
        let worker = tokio::spawn(run_recalculation_worker(
            rx,
            handler.clone(),
            Duration::from_secs(5),
        ));

        for i in 0..5 {
            sink.emit(DomainEvent::goals_changed(vec![format!("g{}", i)]));
        }
        drop(sink);
        worker.await.unwrap();

        assert_eq!(*handler.batches.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn test_separate_bursts_produce_separate_recalculations() {
        let (sink, rx) = ChannelDomainEventSink::new();
        let handler = Arc::new(RecordingHandler::default());
        let worker = tokio::spawn(run_recalculation_worker(
            rx,
            handler.clone(),
            Duration::from_millis(10),
        ));

        sink.emit(DomainEvent::assets_changed(vec!["cash".to_string()]));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sink.emit(DomainEvent::assets_changed(vec!["cash".to_string()]));
        sink.emit(DomainEvent::assets_changed(vec!["btc".to_string()]));
        drop(sink);
        worker.await.unwrap();

        assert_eq!(*handler.batches.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_lifecycle_events_alone_do_not_recalculate() {
        let (sink, rx) = ChannelDomainEventSink::new();
        let handler = Arc::new(RecordingHandler::default());
        let worker = tokio::spawn(run_recalculation_worker(
            rx,
            handler.clone(),
            Duration::from_millis(10),
        ));

        sink.emit(DomainEvent::execution_transitioned(
            "2024-01".parse().unwrap(),
            crate::execution::ExecutionStatus::Draft,
            crate::execution::ExecutionStatus::Executing,
        ));
        drop(sink);
        worker.await.unwrap();

        assert!(handler.batches.lock().unwrap().is_empty());
    }
}
