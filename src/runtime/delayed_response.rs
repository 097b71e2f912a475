// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{
    await_task, stats_ticker, IdleBackoff, RuntimeIdentity, RuntimeWorker, StatisticsRecorder,
};
use crate::config::ComponentType;
use crate::errors::WaitError;
use crate::message::StreamingDataMessage;
use crate::observability::messages::runtime::{
    MessageForwardFailed, MessageProcessingFailed, ResultsFlushed, RuntimeStopped,
    ShutdownStepFailed,
};
use crate::observability::messages::StructuredLog;
use crate::queue::{StreamingMessageQueueConsumer, StreamingMessageQueueProducer};
use crate::traits::{
    delayed_response_channel, DelayedResponseNotifier, DelayedResponseOperator,
    DelayedResponseWaitStrategy,
};

enum Event {
    Cancelled,
    Flush,
    StatsTick,
    Received(Result<Option<StreamingDataMessage>, WaitError>),
}

/// Feeds incoming messages to a [`DelayedResponseOperator`] and forwards its
/// buffered result whenever the response wait strategy asks for it.
///
/// The wait strategy runs in a task of its own, spawned when the worker is
/// built. It only sees message counts and can only request a flush; the flush
/// itself (fetch the result, reset the counter, forward every element) happens
/// in this worker's loop, which is the only place the operator is touched.
/// A message is therefore always attributed to exactly one window.
pub struct DelayedResponseWorker {
    identity: RuntimeIdentity,
    operator: Box<dyn DelayedResponseOperator>,
    consumer: Arc<StreamingMessageQueueConsumer>,
    producer: Arc<StreamingMessageQueueProducer>,
    stats: StatisticsRecorder,
    idle: IdleBackoff,
    notifier: DelayedResponseNotifier,
    strategy_name: &'static str,
    strategy_cancel: CancellationToken,
    strategy_task: Option<JoinHandle<()>>,
    flush_on_shutdown: bool,
    shutdown_timeout: Duration,
}

impl DelayedResponseWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: RuntimeIdentity,
        operator: Box<dyn DelayedResponseOperator>,
        consumer: Arc<StreamingMessageQueueConsumer>,
        producer: Arc<StreamingMessageQueueProducer>,
        stats: StatisticsRecorder,
        mut strategy: Box<dyn DelayedResponseWaitStrategy>,
        handle: &Handle,
        flush_on_shutdown: bool,
        shutdown_timeout: Duration,
    ) -> Self {
        let strategy_cancel = CancellationToken::new();
        let (notifier, collector) = delayed_response_channel(strategy_cancel.clone());
        strategy.set_delayed_response_collector(collector);

        let strategy_name = strategy.name();
        let span = tracing::debug_span!(
            "response_wait_strategy",
            strategy = strategy_name,
            pipeline_id = identity.pipeline_id(),
            component_id = identity.component_id(),
        );
        let strategy_task = handle.spawn(async move { strategy.run().await }.instrument(span));

        Self {
            identity,
            operator,
            consumer,
            producer,
            stats,
            idle: IdleBackoff::new(),
            notifier,
            strategy_name,
            strategy_cancel,
            strategy_task: Some(strategy_task),
            flush_on_shutdown,
            shutdown_timeout,
        }
    }

    async fn process(&mut self, message: StreamingDataMessage) {
        let started = Instant::now();
        match self.operator.on_message(message).await {
            Ok(()) => {
                self.notifier.on_message();
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

    /// Fetch the operator's result set and forward it in the order returned.
    fn retrieve_messages(&mut self) {
        let window = self.notifier.messages_since_last_flush();
        if window == 0 && self.operator.messages_since_last_result() == 0 {
            return;
        }

        let results = self.operator.get_result();
        self.notifier.reset();
        match results {
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
                        self.stats.record_error();
                    }
                }
                ResultsFlushed {
                    identity: &self.identity,
                    strategy: self.strategy_name,
                    window_messages: window,
                    results: forwarded,
                }
                .log();
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
impl RuntimeWorker for DelayedResponseWorker {
    fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::DelayedResponseOperator
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = stats_ticker(self.stats.interval());

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                _ = self.notifier.flush_requested() => Event::Flush,
                _ = ticker.tick() => Event::StatsTick,
                received = self.consumer.wait_for_message() => Event::Received(received),
            };

            match event {
                Event::Cancelled => break,
                Event::Flush => self.retrieve_messages(),
                Event::StatsTick => {
                    self.stats.emit();
                }
                Event::Received(Ok(Some(message))) => {
                    self.idle.reset();
                    self.process(message).await;
                    // let the wait strategy see this count before the next message
                    tokio::task::yield_now().await;
                }
                Event::Received(Ok(None)) | Event::Received(Err(WaitError::Interrupted)) => {
                    if self.idle.pause_until(&cancel, self.notifier.flush_requested()).await {
                        self.retrieve_messages();
                    }
                }
                Event::Received(Err(e)) => {
                    MessageProcessingFailed {
                        identity: &self.identity,
                        error: &e,
                    }
                    .log();
                    self.stats.record_error();
                    if self.idle.pause_until(&cancel, self.notifier.flush_requested()).await {
                        self.retrieve_messages();
                    }
                }
            }
        }

        self.teardown().await;
    }

    async fn teardown(mut self) {
        if self.flush_on_shutdown {
            self.retrieve_messages();
        }

        if let Err(e) = self.operator.shutdown().await {
            ShutdownStepFailed {
                identity: &self.identity,
                step: "operator",
                error: &e,
            }
            .log();
        }

        self.strategy_cancel.cancel();
        if let Some(task) = self.strategy_task.take() {
            await_task(task, self.shutdown_timeout, &self.identity, "response wait strategy").await;
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
