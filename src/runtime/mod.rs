// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime environments hosting pipeline components.
//!
//! Every component runs in its own runtime environment, one tokio task per
//! component. The environment owns the component exclusively together with its
//! queue handles and statistics recorder, so component state is never shared
//! between tasks.
//!
//! | Component | Reads | Writes | Environment |
//! |-----------|-------|--------|-------------|
//! | Source | - | producer | [`SourceRuntimeEnvironment`] |
//! | Direct-response operator | consumer | producer | [`DirectResponseOperatorRuntimeEnvironment`] |
//! | Delayed-response operator | consumer | producer on flush | [`DelayedResponseOperatorRuntimeEnvironment`] |
//! | Emitter / sink | consumer | - | [`EmitterRuntimeEnvironment`] |
//!
//! Lifecycle: `Created -> Running -> Stopped`. Shutdown cancels the task,
//! waits for it to tear down its component and aborts it if it overruns the
//! shutdown timeout. A runtime that was never started can still be shut down;
//! its component is torn down in place.

mod delayed_response;
mod direct_response;
mod emitter;
mod source;
pub mod statistics;

#[cfg(test)]
mod integration_tests;

pub use delayed_response::DelayedResponseWorker;
pub use direct_response::DirectResponseWorker;
pub use emitter::EmitterWorker;
pub use source::SourceWorker;
pub use statistics::{ComponentStatistics, StatisticsRecorder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::{
    DEFAULT_STATS_COLLECTION_INTERVAL_MS, IDLE_MAX_BACKOFF_MS, IDLE_MIN_BACKOFF_MS,
    TASK_SHUTDOWN_TIMEOUT_MS,
};
use crate::config::ComponentType;
use crate::errors::MissingInputError;
use crate::observability::messages::runtime::{RuntimeStarted, TaskShutdownTimedOut};
use crate::observability::messages::StructuredLog;
use crate::queue::{StreamingMessageQueueConsumer, StreamingMessageQueueProducer};
use crate::traits::{Component, DelayedResponseWaitStrategy};

/// Lifecycle state of a runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeState {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeState::Created => write!(f, "CREATED"),
            RuntimeState::Running => write!(f, "RUNNING"),
            RuntimeState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Identifiers attached to everything a runtime logs. Trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeIdentity {
    node_id: String,
    pipeline_id: String,
    component_id: String,
}

fn normalize(value: &str, missing: &'static str) -> Result<String, MissingInputError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(MissingInputError::new(missing));
    }
    Ok(normalized)
}

impl RuntimeIdentity {
    pub fn new(node_id: &str, pipeline_id: &str, component_id: &str) -> Result<Self, MissingInputError> {
        Ok(Self {
            node_id: normalize(node_id, "node id")?,
            pipeline_id: normalize(pipeline_id, "pipeline id")?,
            component_id: normalize(component_id, "component id")?,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }
}

impl fmt::Display for RuntimeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.node_id, self.pipeline_id, self.component_id)
    }
}

/// A component hosted in its own task.
#[async_trait]
pub trait ComponentRuntime: Send {
    fn identity(&self) -> &RuntimeIdentity;

    fn component_type(&self) -> ComponentType;

    fn state(&self) -> RuntimeState;

    /// Spawn the runtime's task. `false` unless the runtime was still `Created`.
    fn start(&mut self, handle: &Handle) -> bool;

    /// Stop the task and tear down the component. `false` if already stopped.
    async fn shutdown(&mut self) -> bool;
}

/// The loop body of a runtime environment.
#[async_trait]
pub trait RuntimeWorker: Send + 'static {
    fn identity(&self) -> &RuntimeIdentity;

    fn component_type(&self) -> ComponentType;

    /// Process until `cancel` fires, then tear down.
    async fn run(self, cancel: CancellationToken);

    /// Release the component without ever having run.
    async fn teardown(self);
}

/// Runtime environment driving one [`RuntimeWorker`].
pub struct RuntimeEnvironment<W: RuntimeWorker> {
    identity: RuntimeIdentity,
    component_type: ComponentType,
    state: RuntimeState,
    cancel: CancellationToken,
    worker: Option<W>,
    task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

pub type SourceRuntimeEnvironment = RuntimeEnvironment<SourceWorker>;
pub type DirectResponseOperatorRuntimeEnvironment = RuntimeEnvironment<DirectResponseWorker>;
pub type DelayedResponseOperatorRuntimeEnvironment = RuntimeEnvironment<DelayedResponseWorker>;
pub type EmitterRuntimeEnvironment = RuntimeEnvironment<EmitterWorker>;

impl<W: RuntimeWorker> RuntimeEnvironment<W> {
    pub fn new(worker: W, shutdown_timeout: Duration) -> Self {
        Self {
            identity: worker.identity().clone(),
            component_type: worker.component_type(),
            state: RuntimeState::Created,
            cancel: CancellationToken::new(),
            worker: Some(worker),
            task: None,
            shutdown_timeout,
        }
    }
}

#[async_trait]
impl<W: RuntimeWorker> ComponentRuntime for RuntimeEnvironment<W> {
    fn identity(&self) -> &RuntimeIdentity {
        &self.identity
    }

    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn state(&self) -> RuntimeState {
        self.state
    }

    fn start(&mut self, handle: &Handle) -> bool {
        if self.state != RuntimeState::Created {
            return false;
        }
        let Some(worker) = self.worker.take() else {
            return false;
        };

        let started = RuntimeStarted {
            identity: &self.identity,
            component_type: self.component_type,
        };
        started.log();
        let span = started.span("runtime");

        let cancel = self.cancel.clone();
        self.task = Some(handle.spawn(worker.run(cancel).instrument(span)));
        self.state = RuntimeState::Running;
        true
    }

    async fn shutdown(&mut self) -> bool {
        if self.state == RuntimeState::Stopped {
            return false;
        }
        self.state = RuntimeState::Stopped;
        self.cancel.cancel();

        if let Some(worker) = self.worker.take() {
            worker.teardown().await;
        }
        if let Some(task) = self.task.take() {
            await_task(task, self.shutdown_timeout, &self.identity, "runtime").await;
        }
        true
    }
}

/// Wait for a task to finish, aborting it once `timeout` has passed.
pub(crate) async fn await_task(
    mut task: JoinHandle<()>,
    timeout: Duration,
    identity: &RuntimeIdentity,
    name: &str,
) {
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(
                node_id = identity.node_id(),
                pipeline_id = identity.pipeline_id(),
                component_id = identity.component_id(),
                error = %e,
                "{} task ended abnormally", name
            );
        }
        Err(_) => {
            TaskShutdownTimedOut {
                identity,
                task: name,
                timeout,
            }
            .log();
            task.abort();
        }
    }
}

/// Ticker driving periodic statistics snapshots.
pub(crate) fn stats_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Growing pause used when a wait strategy returns without a message.
#[derive(Debug)]
pub(crate) struct IdleBackoff {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl IdleBackoff {
    pub(crate) fn new() -> Self {
        let min = Duration::from_millis(IDLE_MIN_BACKOFF_MS);
        Self {
            current: min,
            min,
            max: Duration::from_millis(IDLE_MAX_BACKOFF_MS),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.min;
    }

    pub(crate) async fn pause(&mut self, cancel: &CancellationToken) {
        self.pause_until(cancel, std::future::pending::<()>()).await;
    }

    /// Pause, but return early once `wake` resolves. `true` if it did.
    pub(crate) async fn pause_until<F>(&mut self, cancel: &CancellationToken, wake: F) -> bool
    where
        F: std::future::Future<Output = ()>,
    {
        let woken = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = wake => true,
            _ = tokio::time::sleep(self.current) => false,
        };
        if !woken {
            self.current = (self.current * 2).min(self.max);
        }
        woken
    }
}

/// Assembles the runtime environment matching a component's variant.
///
/// Every collaborator the chosen environment needs must be supplied; a
/// missing one fails with [`MissingInputError`] naming it. Building a
/// delayed-response environment spawns its wait strategy immediately, so a
/// task runtime must be reachable (explicit handle or ambient runtime).
pub struct RuntimeEnvironmentBuilder {
    node_id: Option<String>,
    pipeline_id: Option<String>,
    component_id: Option<String>,
    component: Option<Component>,
    consumer: Option<Arc<StreamingMessageQueueConsumer>>,
    producer: Option<Arc<StreamingMessageQueueProducer>>,
    stats_producer: Option<Arc<StreamingMessageQueueProducer>>,
    response_wait_strategy: Option<Box<dyn DelayedResponseWaitStrategy>>,
    stats_interval: Duration,
    handle: Option<Handle>,
    flush_on_shutdown: bool,
    shutdown_timeout: Duration,
}

impl Default for RuntimeEnvironmentBuilder {
    fn default() -> Self {
        Self {
            node_id: None,
            pipeline_id: None,
            component_id: None,
            component: None,
            consumer: None,
            producer: None,
            stats_producer: None,
            response_wait_strategy: None,
            stats_interval: Duration::from_millis(DEFAULT_STATS_COLLECTION_INTERVAL_MS),
            handle: None,
            flush_on_shutdown: true,
            shutdown_timeout: Duration::from_millis(TASK_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

impl RuntimeEnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_pipeline_id(mut self, pipeline_id: impl Into<String>) -> Self {
        self.pipeline_id = Some(pipeline_id.into());
        self
    }

    pub fn with_component_id(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_consumer(mut self, consumer: Arc<StreamingMessageQueueConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    pub fn with_producer(mut self, producer: Arc<StreamingMessageQueueProducer>) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn with_stats_producer(mut self, producer: Arc<StreamingMessageQueueProducer>) -> Self {
        self.stats_producer = Some(producer);
        self
    }

    pub fn with_response_wait_strategy(mut self, strategy: Box<dyn DelayedResponseWaitStrategy>) -> Self {
        self.response_wait_strategy = Some(strategy);
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_flush_on_shutdown(mut self, flush: bool) -> Self {
        self.flush_on_shutdown = flush;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    fn identity(&self) -> Result<RuntimeIdentity, MissingInputError> {
        RuntimeIdentity::new(
            self.node_id.as_deref().unwrap_or_default(),
            self.pipeline_id.as_deref().unwrap_or_default(),
            self.component_id.as_deref().unwrap_or_default(),
        )
    }

    /// First collaborator still missing to host a component of `component_type`.
    ///
    /// Lets callers check the wiring before handing over a component that
    /// `build` would otherwise drop on failure.
    pub fn missing_input_for(&self, component_type: ComponentType) -> Option<MissingInputError> {
        if let Err(e) = self.identity() {
            return Some(e);
        }
        if self.stats_producer.is_none() {
            return Some(MissingInputError::new("statistics producer"));
        }
        let needs_consumer = component_type != ComponentType::Source;
        let needs_producer = matches!(
            component_type,
            ComponentType::Source
                | ComponentType::DirectResponseOperator
                | ComponentType::DelayedResponseOperator
        );
        if needs_consumer && self.consumer.is_none() {
            return Some(MissingInputError::new("consumer"));
        }
        if needs_producer && self.producer.is_none() {
            return Some(MissingInputError::new("producer"));
        }
        if component_type == ComponentType::DelayedResponseOperator {
            if self.response_wait_strategy.is_none() {
                return Some(MissingInputError::new("response wait strategy"));
            }
            if self.handle.is_none() && Handle::try_current().is_err() {
                return Some(MissingInputError::new("task runtime"));
            }
        }
        None
    }

    pub fn build(self) -> Result<Box<dyn ComponentRuntime>, MissingInputError> {
        let identity = self.identity()?;
        let component_type = self
            .component
            .as_ref()
            .map(Component::component_type)
            .ok_or(MissingInputError::new("component"))?;
        if let Some(missing) = self.missing_input_for(component_type) {
            return Err(missing);
        }
        let component = self.component.ok_or(MissingInputError::new("component"))?;
        let stats_producer = self
            .stats_producer
            .ok_or(MissingInputError::new("statistics producer"))?;
        let stats = StatisticsRecorder::new(
            identity.component_id(),
            component.component_type(),
            stats_producer,
            self.stats_interval,
        );
        let timeout = self.shutdown_timeout;

        let runtime: Box<dyn ComponentRuntime> = match component {
            Component::Source(source) => {
                let producer = self.producer.ok_or(MissingInputError::new("producer"))?;
                Box::new(RuntimeEnvironment::new(
                    SourceWorker::new(identity, source, producer, stats),
                    timeout,
                ))
            }
            Component::DirectResponse(operator) => {
                let consumer = self.consumer.ok_or(MissingInputError::new("consumer"))?;
                let producer = self.producer.ok_or(MissingInputError::new("producer"))?;
                Box::new(RuntimeEnvironment::new(
                    DirectResponseWorker::new(identity, operator, consumer, producer, stats),
                    timeout,
                ))
            }
            Component::DelayedResponse(operator) => {
                let consumer = self.consumer.ok_or(MissingInputError::new("consumer"))?;
                let producer = self.producer.ok_or(MissingInputError::new("producer"))?;
                let strategy = self
                    .response_wait_strategy
                    .ok_or(MissingInputError::new("response wait strategy"))?;
                let handle = match self.handle {
                    Some(handle) => handle,
                    None => Handle::try_current().map_err(|_| MissingInputError::new("task runtime"))?,
                };
                Box::new(RuntimeEnvironment::new(
                    DelayedResponseWorker::new(
                        identity,
                        operator,
                        consumer,
                        producer,
                        stats,
                        strategy,
                        &handle,
                        self.flush_on_shutdown,
                        timeout,
                    ),
                    timeout,
                ))
            }
            Component::Emitter(emitter) => {
                let consumer = self.consumer.ok_or(MissingInputError::new("consumer"))?;
                Box::new(RuntimeEnvironment::new(
                    EmitterWorker::new(identity, emitter, consumer, stats),
                    timeout,
                ))
            }
        };
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_normalized() {
        let identity = RuntimeIdentity::new(" Node-1 ", "Prices", " AGG ").unwrap();
        assert_eq!(identity.node_id(), "node-1");
        assert_eq!(identity.pipeline_id(), "prices");
        assert_eq!(identity.component_id(), "agg");
        assert_eq!(identity.to_string(), "node-1/prices/agg");
    }

    #[test]
    fn test_identity_requires_every_id() {
        assert_eq!(
            RuntimeIdentity::new("", "p", "c").unwrap_err(),
            MissingInputError::new("node id")
        );
        assert_eq!(
            RuntimeIdentity::new("n", "  ", "c").unwrap_err(),
            MissingInputError::new("pipeline id")
        );
        assert_eq!(
            RuntimeIdentity::new("n", "p", "").unwrap_err(),
            MissingInputError::new("component id")
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RuntimeState::Running.to_string(), "RUNNING");
        assert_eq!(
            serde_json::to_string(&RuntimeState::Stopped).unwrap(),
            "\"STOPPED\""
        );
    }

    #[tokio::test]
    async fn test_idle_backoff_grows_and_resets() {
        let cancel = CancellationToken::new();
        let mut backoff = IdleBackoff::new();
        backoff.pause(&cancel).await;
        backoff.pause(&cancel).await;
        assert_eq!(backoff.current, Duration::from_millis(IDLE_MIN_BACKOFF_MS * 4));
        backoff.reset();
        assert_eq!(backoff.current, Duration::from_millis(IDLE_MIN_BACKOFF_MS));
    }

    #[tokio::test]
    async fn test_idle_backoff_cut_short_by_wake() {
        let cancel = CancellationToken::new();
        let mut backoff = IdleBackoff::new();
        backoff.current = Duration::from_secs(30);

        let wake = std::sync::Arc::new(tokio::sync::Notify::new());
        let waker = wake.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waker.notify_one();
        });

        let pause = backoff.pause_until(&cancel, wake.notified());
        let woken = tokio::time::timeout(Duration::from_secs(2), pause)
            .await
            .expect("wake should end the pause");
        assert!(woken);
        assert_eq!(backoff.current, Duration::from_secs(30));
    }
}
