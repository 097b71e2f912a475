// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::QueueCore;
use crate::errors::{QueueError, WaitError};
use crate::message::StreamingDataMessage;

/// The single writing end of a queue.
#[derive(Debug)]
pub struct StreamingMessageQueueProducer {
    core: Arc<QueueCore>,
}

impl StreamingMessageQueueProducer {
    pub(super) fn new(core: Arc<QueueCore>) -> Self {
        Self { core }
    }

    pub fn queue_id(&self) -> &str {
        &self.core.id
    }

    /// Append a message and wake the consumer. `false` if the message was not stored.
    pub fn insert(&self, message: &StreamingDataMessage) -> bool {
        let inserted = self.core.insert(message);
        if inserted {
            self.core.wait_strategy.on_insert();
        }
        inserted
    }

    /// Wake a consumer blocked on this queue.
    pub fn force_lock_release(&self) {
        self.core.wait_strategy.force_lock_release();
    }
}

/// The single reading end of a queue.
#[derive(Debug)]
pub struct StreamingMessageQueueConsumer {
    core: Arc<QueueCore>,
}

impl StreamingMessageQueueConsumer {
    pub(super) fn new(core: Arc<QueueCore>) -> Self {
        Self { core }
    }

    pub fn queue_id(&self) -> &str {
        &self.core.id
    }

    /// Next unread message without waiting.
    pub fn next(&self) -> Result<Option<StreamingDataMessage>, QueueError> {
        self.core.next()
    }

    /// Wait for a message according to the queue's wait strategy.
    ///
    /// A queue closed underneath the waiter reports `Interrupted`.
    pub async fn wait_for_message(&self) -> Result<Option<StreamingDataMessage>, WaitError> {
        let strategy = self.core.wait_strategy.clone();
        match strategy.wait_for(self).await {
            Err(WaitError::Queue(QueueError::Closed(_))) => Err(WaitError::Interrupted),
            outcome => outcome,
        }
    }
}
