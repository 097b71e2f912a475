// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::errors::WaitError;
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueueConsumer;
use crate::traits::QueueWaitStrategy;

/// Parks the consumer until the producer signals an insert or a forced release.
///
/// The waiter registers for a wake-up before it looks at the queue, so an
/// insert landing between the check and the park is never missed. A wake that
/// finds the queue empty parks again unless it came from a forced release.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    signal: Notify,
    released: AtomicBool,
    shutdown: CancellationToken,
}

impl BlockingWaitStrategy {
    pub const NAME: &'static str = "blocking";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueWaitStrategy for BlockingWaitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn wait_for(
        &self,
        consumer: &StreamingMessageQueueConsumer,
    ) -> Result<Option<StreamingDataMessage>, WaitError> {
        if self.shutdown.is_cancelled() {
            return Err(WaitError::Interrupted);
        }

        loop {
            let notified = self.signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = consumer.next()? {
                return Ok(Some(message));
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(WaitError::Interrupted),
                _ = &mut notified => {}
            }

            let released = self.released.swap(false, Ordering::AcqRel);
            if let Some(message) = consumer.next()? {
                return Ok(Some(message));
            }
            if released {
                return Ok(None);
            }
            // permit left over from an insert that was already consumed
        }
    }

    fn on_insert(&self) {
        self.signal.notify_one();
    }

    fn force_lock_release(&self) {
        self.released.store(true, Ordering::Release);
        self.signal.notify_one();
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
        self.signal.notify_waiters();
    }
}
