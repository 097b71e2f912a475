// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{stats_ticker, IdleBackoff, RuntimeIdentity, RuntimeWorker, StatisticsRecorder};
use crate::config::ComponentType;
use crate::errors::WaitError;
use crate::message::StreamingDataMessage;
use crate::observability::messages::runtime::{
    MessageForwardFailed, MessageProcessingFailed, RuntimeStopped, ShutdownStepFailed,
};
use crate::observability::messages::StructuredLog;
use crate::queue::{StreamingMessageQueueConsumer, StreamingMessageQueueProducer};
use crate::traits::DirectResponseOperator;

enum Event {
    Cancelled,
    StatsTick,
    Received(Result<Option<StreamingDataMessage>, WaitError>),
}

/// Feeds every incoming message to a [`DirectResponseOperator`] and forwards
/// its results right away.
pub struct DirectResponseWorker {
    identity: RuntimeIdentity,
    operator: Box<dyn DirectResponseOperator>,
    consumer: Arc<StreamingMessageQueueConsumer>,
    producer: Arc<StreamingMessageQueueProducer>,
    stats: StatisticsRecorder,
    idle: IdleBackoff,
}

impl DirectResponseWorker {
    pub fn new(
        identity: RuntimeIdentity,
        operator: Box<dyn DirectResponseOperator>,
        consumer: Arc<StreamingMessageQueueConsumer>,
        producer: Arc<StreamingMessageQueueProducer>,
        stats: StatisticsRecorder,
    ) -> Self {
        Self {
            identity,
            operator,
            consumer,
            producer,
            stats,
            idle: IdleBackoff::new(),
        }
    }

    async fn process(&mut self, message: StreamingDataMessage) {
        let started = Instant::now();
        match self.operator.on_message(message).await {
            Ok(results) => {
                let mut forwarded = 0usize;
                for result in &results {
                    if self.producer.insert(result) {
                        forwarded += 1;
                    } else {
                        MessageForwardFailed {
                            identity: &self.identity,
                            queue_id: self.producer.queue_id(),
                        }
                        .log();
                    }
                }
                if forwarded < results.len() {
                    self.stats.record_error();
                }
                self.stats.record_message(started.elapsed());
            }
            Err(e) => {
                MessageProcessingFailed {
                    identity: &self.identity,
                    error: &e,
                }
                .log();
                self.stats.record_error();
            }
        }
    }
}

#[async_trait]
impl RuntimeWorker for DirectResponseWorker {
    fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::DirectResponseOperator
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = stats_ticker(self.stats.interval());

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                _ = ticker.tick() => Event::StatsTick,
                received = self.consumer.wait_for_message() => Event::Received(received),
            };

            match event {
                Event::Cancelled => break,
                Event::StatsTick => {
                    self.stats.emit();
                }
                Event::Received(Ok(Some(message))) => {
                    self.idle.reset();
                    self.process(message).await;
                    tokio::task::yield_now().await;
                }
                Event::Received(Ok(None)) | Event::Received(Err(WaitError::Interrupted)) => {
                    self.idle.pause(&cancel).await;
                }
                Event::Received(Err(e)) => {
                    MessageProcessingFailed {
                        identity: &self.identity,
                        error: &e,
                    }
                    .log();
                    self.stats.record_error();
                    self.idle.pause(&cancel).await;
                }
            }
        }

        self.teardown().await;
    }

    async fn teardown(mut self) {
        if let Err(e) = self.operator.shutdown().await {
            ShutdownStepFailed {
                identity: &self.identity,
                step: "operator",
                error: &e,
            }
            .log();
        }
        self.stats.emit();
        RuntimeStopped {
            identity: &self.identity,
            total_messages: self.stats.total_messages(),
            processing_errors: self.stats.processing_errors(),
        }
        .log();
    }
}
