// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Durable single-producer / single-consumer message queues.

mod handles;
mod log;

pub use handles::{StreamingMessageQueueConsumer, StreamingMessageQueueProducer};
pub use log::DurableMessageLog;

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::config::StreamingMessageQueueConfiguration;
use crate::errors::{ConfigurationError, QueueError};
use crate::message::StreamingDataMessage;
use crate::observability::messages::queue::{QueueInitialized, QueueOperationFailed, QueueShutdown};
use crate::observability::messages::StructuredLog;
use crate::strategy::queue::wait_strategy_for_name;
use crate::traits::QueueWaitStrategy;

pub(crate) struct QueueCore {
    id: String,
    log: DurableMessageLog,
    wait_strategy: Arc<dyn QueueWaitStrategy>,
    shut_down: AtomicBool,
}

impl QueueCore {
    fn insert(&self, message: &StreamingDataMessage) -> bool {
        if self.shut_down.load(Ordering::Acquire) {
            return false;
        }
        match self.log.append(message) {
            Ok(()) => true,
            Err(e) => {
                QueueOperationFailed {
                    queue_id: &self.id,
                    operation: "insert",
                    error: &e,
                }
                .log();
                false
            }
        }
    }

    fn next(&self) -> Result<Option<StreamingDataMessage>, QueueError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(QueueError::Closed(self.id.clone()));
        }
        self.log.read_next()
    }
}

impl fmt::Debug for QueueCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueCore")
            .field("id", &self.id)
            .field("wait_strategy", &self.wait_strategy.name())
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

/// A named, durable channel with exactly one producer and one consumer handle.
///
/// `insert` and `next` on the queue itself never wait and never signal the
/// wait strategy; the producer and consumer handles add that behaviour.
#[derive(Debug)]
pub struct StreamingMessageQueue {
    core: Arc<QueueCore>,
    delete_on_shutdown: bool,
    producer: Arc<StreamingMessageQueueProducer>,
    consumer: Arc<StreamingMessageQueueConsumer>,
}

impl StreamingMessageQueue {
    /// Open the queue's log under `<basePath>/<queueId>/` and bind its wait strategy.
    ///
    /// With delete-on-shutdown enabled, a directory left over from an earlier
    /// run is removed first.
    pub fn initialize(config: &StreamingMessageQueueConfiguration) -> Result<Self, ConfigurationError> {
        let id = config.id.trim();
        if id.is_empty() {
            return Err(ConfigurationError::MissingQueueId);
        }

        let directory = config.durability.get_base_path().join(id);
        let delete_on_shutdown = config.durability.get_delete_on_shutdown();
        let storage_error = |source: std::io::Error| ConfigurationError::QueueStorage {
            queue_id: id.to_string(),
            path: directory.clone(),
            source,
        };

        if delete_on_shutdown && directory.exists() {
            std::fs::remove_dir_all(&directory).map_err(storage_error)?;
        }
        let log = DurableMessageLog::open(id, directory.clone(), config.durability.get_rolling_interval())
            .map_err(storage_error)?;

        let wait_strategy = wait_strategy_for_name(config.get_wait_strategy());
        let core = Arc::new(QueueCore {
            id: id.to_string(),
            log,
            wait_strategy,
            shut_down: AtomicBool::new(false),
        });

        QueueInitialized {
            queue_id: id,
            wait_strategy: core.wait_strategy.name(),
            directory: &directory,
        }
        .log();

        Ok(Self {
            producer: Arc::new(StreamingMessageQueueProducer::new(core.clone())),
            consumer: Arc::new(StreamingMessageQueueConsumer::new(core.clone())),
            core,
            delete_on_shutdown,
        })
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn directory(&self) -> &Path {
        self.core.log.directory()
    }

    /// Append without signalling the wait strategy.
    pub fn insert(&self, message: &StreamingDataMessage) -> bool {
        self.core.insert(message)
    }

    /// Next unread message, or `None` if there is none or it could not be read.
    pub fn next(&self) -> Option<StreamingDataMessage> {
        match self.core.next() {
            Ok(message) => message,
            Err(QueueError::Closed(_)) => None,
            Err(e) => {
                QueueOperationFailed {
                    queue_id: &self.core.id,
                    operation: "next",
                    error: &e,
                }
                .log();
                None
            }
        }
    }

    pub fn producer(&self) -> Arc<StreamingMessageQueueProducer> {
        self.producer.clone()
    }

    pub fn consumer(&self) -> Arc<StreamingMessageQueueConsumer> {
        self.consumer.clone()
    }

    pub fn wait_strategy(&self) -> Arc<dyn QueueWaitStrategy> {
        self.core.wait_strategy.clone()
    }

    /// Messages appended since initialize.
    pub fn size(&self) -> u64 {
        self.core.log.appended()
    }

    pub fn is_shut_down(&self) -> bool {
        self.core.shut_down.load(Ordering::Acquire)
    }

    /// Close the log, interrupt waiters and optionally delete storage.
    /// Returns `false` if the queue was already shut down.
    pub fn shutdown(&self) -> bool {
        if self.core.shut_down.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.core.wait_strategy.shutdown();
        if let Err(e) = self.core.log.close(self.delete_on_shutdown) {
            warn!(queue_id = %self.core.id, error = %e, "failed to release queue storage");
        }
        QueueShutdown {
            queue_id: &self.core.id,
            deleted: self.delete_on_shutdown,
        }
        .log();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WaitError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn queue(dir: &TempDir, id: &str, strategy: &str) -> StreamingMessageQueue {
        StreamingMessageQueue::initialize(
            &StreamingMessageQueueConfiguration::new(id)
                .with_wait_strategy(strategy)
                .with_base_path(dir.path()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let result = StreamingMessageQueue::initialize(&StreamingMessageQueueConfiguration::new("  "));
        assert!(matches!(result, Err(ConfigurationError::MissingQueueId)));
    }

    #[test]
    fn test_unopenable_storage_is_rejected() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = StreamingMessageQueue::initialize(
            &StreamingMessageQueueConfiguration::new("q").with_base_path(&blocker),
        );
        assert!(matches!(result, Err(ConfigurationError::QueueStorage { .. })));
    }

    #[test]
    fn test_handles_are_shared() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir, "q", "blocking");

        assert!(Arc::ptr_eq(&q.producer(), &q.producer()));
        assert!(Arc::ptr_eq(&q.consumer(), &q.consumer()));
    }

    #[test]
    fn test_insert_and_next_are_fifo() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir, "q", "directPass");

        for i in 0..10 {
            assert!(q.insert(&StreamingDataMessage::new(vec![i as u8], i)));
        }
        assert_eq!(q.size(), 10);

        for i in 0..10 {
            assert_eq!(q.next().unwrap().body(), &[i as u8]);
        }
        assert!(q.next().is_none());
    }

    #[test]
    fn test_stale_directory_removed_on_initialize() {
        let dir = TempDir::new().unwrap();
        {
            let q = StreamingMessageQueue::initialize(
                &StreamingMessageQueueConfiguration::new("q")
                    .with_base_path(dir.path())
                    .with_delete_on_shutdown(false),
            )
            .unwrap();
            q.insert(&StreamingDataMessage::new("old", 1));
            q.shutdown();
        }
        assert!(dir.path().join("q").exists());

        let q = queue(&dir, "q", "blocking");
        assert!(q.next().is_none());
    }

    #[test]
    fn test_shutdown_is_idempotent_and_deletes_storage() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir, "q", "blocking");
        q.insert(&StreamingDataMessage::new("x", 1));

        assert!(q.shutdown());
        assert!(q.is_shut_down());
        assert!(!q.directory().exists());
        assert!(!q.shutdown());

        assert!(!q.insert(&StreamingDataMessage::new("y", 2)));
        assert!(!q.producer().insert(&StreamingDataMessage::new("z", 3)));
        assert!(q.next().is_none());
    }

    #[tokio::test]
    async fn test_wait_is_interrupted_by_shutdown() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir, "q", "blocking");
        let consumer = q.consumer();

        let waiter = tokio::spawn(async move { consumer.wait_for_message().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.shutdown();

        let outcome = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, Err(WaitError::Interrupted)));
    }
}
