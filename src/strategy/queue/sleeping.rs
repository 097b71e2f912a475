// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::consts::{SLEEPING_MAX_BACKOFF_MS, SLEEPING_MIN_BACKOFF_MS};
use crate::errors::WaitError;
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueueConsumer;
use crate::traits::QueueWaitStrategy;

/// Polls the queue, sleeping with an exponential backoff between empty polls.
#[derive(Debug, Default)]
pub struct SleepingWaitStrategy {
    released: AtomicBool,
    shutdown: CancellationToken,
}

impl SleepingWaitStrategy {
    pub const NAME: &'static str = "sleeping";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueWaitStrategy for SleepingWaitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn wait_for(
        &self,
        consumer: &StreamingMessageQueueConsumer,
    ) -> Result<Option<StreamingDataMessage>, WaitError> {
        let mut backoff = Duration::from_millis(SLEEPING_MIN_BACKOFF_MS);
        let max_backoff = Duration::from_millis(SLEEPING_MAX_BACKOFF_MS);

        loop {
            if self.shutdown.is_cancelled() {
                return Err(WaitError::Interrupted);
            }
            if let Some(message) = consumer.next()? {
                return Ok(Some(message));
            }
            if self.released.swap(false, Ordering::AcqRel) {
                return Ok(None);
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(WaitError::Interrupted),
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(max_backoff);
        }
    }

    fn force_lock_release(&self) {
        self.released.store(true, Ordering::Release);
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
