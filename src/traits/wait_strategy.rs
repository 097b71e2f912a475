// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::config::ComponentSettings;
use crate::errors::{ConfigurationError, WaitError};
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueueConsumer;

/// How a consumer waits on an empty queue and how a producer wakes it.
///
/// `wait_for` returning `Ok(None)` is a benign wake (forced release, spurious
/// notification, or a non-suspending strategy); callers simply try again.
#[async_trait]
pub trait QueueWaitStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn wait_for(
        &self,
        consumer: &StreamingMessageQueueConsumer,
    ) -> Result<Option<StreamingDataMessage>, WaitError>;

    /// Called by the producer handle after every insert.
    fn on_insert(&self) {}

    /// Wake a waiting consumer even though nothing was inserted through the
    /// producer handle.
    fn force_lock_release(&self);

    /// Interrupt current and future waits.
    fn shutdown(&self);
}

/// Decides when a delayed-response operator has to hand out its result.
///
/// The strategy runs as its own task and only ever talks to the operator's
/// runtime through a [`DelayedResponseCollector`].
#[async_trait]
pub trait DelayedResponseWaitStrategy: Send {
    fn name(&self) -> &'static str;

    /// Apply the strategy options, already stripped of the `waitStrategy.cfg.` prefix.
    fn initialize(&mut self, settings: &ComponentSettings) -> Result<(), ConfigurationError>;

    fn set_delayed_response_collector(&mut self, collector: DelayedResponseCollector);

    /// Evaluate the trigger until the collector signals shutdown.
    async fn run(&mut self);
}

/// Create the two ends linking a delayed-response runtime with its wait strategy.
///
/// The runtime keeps the notifier and reports every processed message through
/// it; the strategy gets the collector, reads the count and requests flushes.
/// Flush requests coalesce into a single pending slot.
pub fn delayed_response_channel(
    shutdown: CancellationToken,
) -> (DelayedResponseNotifier, DelayedResponseCollector) {
    let (processed_tx, processed_rx) = watch::channel(0u64);
    let flush = Arc::new(Notify::new());
    (
        DelayedResponseNotifier {
            processed: processed_tx,
            flush: flush.clone(),
        },
        DelayedResponseCollector {
            processed: processed_rx,
            flush,
            shutdown,
        },
    )
}

/// Runtime side of the delayed-response channel.
#[derive(Debug)]
pub struct DelayedResponseNotifier {
    processed: watch::Sender<u64>,
    flush: Arc<Notify>,
}

impl DelayedResponseNotifier {
    /// Record one processed message.
    pub fn on_message(&self) {
        self.processed.send_modify(|count| *count += 1);
    }

    pub fn messages_since_last_flush(&self) -> u64 {
        *self.processed.borrow()
    }

    /// Zero the counter after a flush.
    pub fn reset(&self) {
        self.processed.send_replace(0);
    }

    /// Resolves once the strategy has requested a flush.
    pub async fn flush_requested(&self) {
        self.flush.notified().await
    }
}

/// Strategy side of the delayed-response channel.
#[derive(Debug)]
pub struct DelayedResponseCollector {
    processed: watch::Receiver<u64>,
    flush: Arc<Notify>,
    shutdown: CancellationToken,
}

impl DelayedResponseCollector {
    /// Ask the runtime to fetch and forward the operator's buffered result.
    pub fn retrieve_messages(&self) {
        self.flush.notify_one();
    }

    pub fn messages_since_last_flush(&self) -> u64 {
        *self.processed.borrow()
    }

    /// Wait for the message count to change. `false` once the runtime is gone.
    pub async fn changed(&mut self) -> bool {
        self.processed.changed().await.is_ok()
    }

    pub fn shutdown_requested(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Token cancelled when the owning runtime tears the strategy down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_counts_flow_to_collector() {
        let (notifier, collector) = delayed_response_channel(CancellationToken::new());

        notifier.on_message();
        notifier.on_message();
        assert_eq!(collector.messages_since_last_flush(), 2);

        notifier.reset();
        assert_eq!(collector.messages_since_last_flush(), 0);
        assert_eq!(notifier.messages_since_last_flush(), 0);
    }

    #[tokio::test]
    async fn test_flush_requests_coalesce() {
        let (notifier, collector) = delayed_response_channel(CancellationToken::new());

        collector.retrieve_messages();
        collector.retrieve_messages();

        tokio::time::timeout(Duration::from_millis(100), notifier.flush_requested())
            .await
            .expect("first flush request should be pending");
        let second = tokio::time::timeout(Duration::from_millis(50), notifier.flush_requested()).await;
        assert!(second.is_err(), "requests should coalesce into one slot");
    }

    #[tokio::test]
    async fn test_changed_ends_when_notifier_dropped() {
        let (notifier, mut collector) = delayed_response_channel(CancellationToken::new());

        notifier.on_message();
        assert!(collector.changed().await);

        drop(notifier);
        assert!(!collector.changed().await);
    }
}
