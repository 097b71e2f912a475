// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{stats_ticker, IdleBackoff, RuntimeIdentity, RuntimeWorker, StatisticsRecorder};
use crate::config::ComponentType;
use crate::errors::ProcessingError;
use crate::message::StreamingDataMessage;
use crate::observability::messages::runtime::{
    MessageForwardFailed, MessageProcessingFailed, RuntimeStopped, ShutdownStepFailed,
    SourceExhausted,
};
use crate::observability::messages::StructuredLog;
use crate::queue::StreamingMessageQueueProducer;
use crate::traits::Source;

enum Event {
    Cancelled,
    StatsTick,
    Produced(Result<Option<StreamingDataMessage>, ProcessingError>),
}

/// Pulls messages from a [`Source`] and writes them to the destination queue.
/// An exhausted source parks until shutdown; a failing one backs off before
/// it is asked again.
pub struct SourceWorker {
    identity: RuntimeIdentity,
    source: Box<dyn Source>,
    producer: Arc<StreamingMessageQueueProducer>,
    stats: StatisticsRecorder,
    idle: IdleBackoff,
}

impl SourceWorker {
    pub fn new(
        identity: RuntimeIdentity,
        source: Box<dyn Source>,
        producer: Arc<StreamingMessageQueueProducer>,
        stats: StatisticsRecorder,
    ) -> Self {
        Self {
            identity,
            source,
            producer,
            stats,
            idle: IdleBackoff::new(),
        }
    }

    fn forward(&mut self, message: StreamingDataMessage, started: Instant) {
        if self.producer.insert(&message) {
            self.stats.record_message(started.elapsed());
        } else {
            MessageForwardFailed {
                identity: &self.identity,
                queue_id: self.producer.queue_id(),
            }
            .log();
            self.stats.record_error();
        }
    }
}

#[async_trait]
impl RuntimeWorker for SourceWorker {
    fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Source
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = stats_ticker(self.stats.interval());
        let mut exhausted = false;

        loop {
            let started = Instant::now();
            let event = if exhausted {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Event::Cancelled,
                    _ = ticker.tick() => Event::StatsTick,
                }
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Event::Cancelled,
                    _ = ticker.tick() => Event::StatsTick,
                    produced = self.source.next_message() => Event::Produced(produced),
                }
            };

            match event {
                Event::Cancelled => break,
                Event::StatsTick => {
                    self.stats.emit();
                }
                Event::Produced(Ok(Some(message))) => {
                    self.idle.reset();
                    self.forward(message, started);
                    tokio::task::yield_now().await;
                }
                Event::Produced(Ok(None)) => {
                    exhausted = true;
                    SourceExhausted {
                        identity: &self.identity,
                        total_messages: self.stats.total_messages(),
                    }
                    .log();
                }
                Event::Produced(Err(e)) => {
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
        if let Err(e) = self.source.shutdown().await {
            ShutdownStepFailed {
                identity: &self.identity,
                step: "source",
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
