// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::WaitError;
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueueConsumer;
use crate::traits::QueueWaitStrategy;

/// Looks at the queue once and returns; retrying is up to the caller.
#[derive(Debug, Default)]
pub struct DirectPassWaitStrategy {
    shut_down: AtomicBool,
}

impl DirectPassWaitStrategy {
    pub const NAME: &'static str = "directPass";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueWaitStrategy for DirectPassWaitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn wait_for(
        &self,
        consumer: &StreamingMessageQueueConsumer,
    ) -> Result<Option<StreamingDataMessage>, WaitError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(WaitError::Interrupted);
        }
        Ok(consumer.next()?)
    }

    fn force_lock_release(&self) {}

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}
