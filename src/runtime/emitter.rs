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
    MessageProcessingFailed, RuntimeStopped, ShutdownStepFailed,
};
use crate::observability::messages::StructuredLog;
use crate::queue::StreamingMessageQueueConsumer;
use crate::traits::Emitter;

enum Event {
    Cancelled,
    StatsTick,
    Received(Result<Option<StreamingDataMessage>, WaitError>),
}

/// Hands every incoming message to an [`Emitter`]; writes nothing downstream.
pub struct EmitterWorker {
    identity: RuntimeIdentity,
    emitter: Box<dyn Emitter>,
    consumer: Arc<StreamingMessageQueueConsumer>,
    stats: StatisticsRecorder,
    idle: IdleBackoff,
}

impl EmitterWorker {
    pub fn new(
        identity: RuntimeIdentity,
        emitter: Box<dyn Emitter>,
        consumer: Arc<StreamingMessageQueueConsumer>,
        stats: StatisticsRecorder,
    ) -> Self {
        Self {
            identity,
            emitter,
            consumer,
            stats,
            idle: IdleBackoff::new(),
        }
    }
}

#[async_trait]
impl RuntimeWorker for EmitterWorker {
    fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Emitter
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
                    let started = Instant::now();
                    match self.emitter.on_message(message).await {
                        Ok(()) => self.stats.record_message(started.elapsed()),
                        Err(e) => {
                            MessageProcessingFailed {
                                identity: &self.identity,
                                error: &e,
                            }
                            .log();
                            self.stats.record_error();
                        }
                    }
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
        if let Err(e) = self.emitter.shutdown().await {
            ShutdownStepFailed {
                identity: &self.identity,
                step: "emitter",
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
