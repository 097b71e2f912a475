// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for component runtime events.
//!
//! * Runtime start and stop
//! * Messages failing inside a component or on the way downstream
//! * Delayed-response flushes
//! * Teardown problems

use crate::config::ComponentType;
use crate::observability::messages::StructuredLog;
use crate::runtime::RuntimeIdentity;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Runtime task launched.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RuntimeStarted<'a> {
    pub identity: &'a RuntimeIdentity,
    pub component_type: ComponentType,
}

impl Display for RuntimeStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Started {} runtime {}", self.component_type, self.identity)
    }
}

impl StructuredLog for RuntimeStarted<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            component_type = %self.component_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "runtime",
            span_name = name,
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            component_type = %self.component_type,
        )
    }
}

/// Runtime loop finished and the component was shut down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RuntimeStopped<'a> {
    pub identity: &'a RuntimeIdentity,
    pub total_messages: u64,
    pub processing_errors: u64,
}

impl Display for RuntimeStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stopped runtime {} after {} messages ({} errors)",
            self.identity, self.total_messages, self.processing_errors
        )
    }
}

impl StructuredLog for RuntimeStopped<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            total_messages = self.total_messages,
            processing_errors = self.processing_errors,
            "{}", self
        );
    }
}

/// A single message failed; it is dropped and the loop continues.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use spqr_pipeline::observability::messages::runtime::MessageProcessingFailed;
/// use spqr_pipeline::runtime::RuntimeIdentity;
///
/// let identity = RuntimeIdentity::new("node-1", "prices", "agg").unwrap();
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "bad body");
/// let msg = MessageProcessingFailed {
///     identity: &identity,
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Runtime node-1/prices/agg dropped a message: bad body");
/// ```
pub struct MessageProcessingFailed<'a> {
    pub identity: &'a RuntimeIdentity,
    pub error: &'a dyn std::error::Error,
}

impl Display for MessageProcessingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Runtime {} dropped a message: {}", self.identity, self.error)
    }
}

impl StructuredLog for MessageProcessingFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            error = %self.error,
            "{}", self
        );
    }
}

/// Destination queue refused a message.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct MessageForwardFailed<'a> {
    pub identity: &'a RuntimeIdentity,
    pub queue_id: &'a str,
}

impl Display for MessageForwardFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Runtime {} failed to forward a message to queue '{}'",
            self.identity, self.queue_id
        )
    }
}

impl StructuredLog for MessageForwardFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            queue_id = self.queue_id,
            "{}", self
        );
    }
}

/// Source has no more messages; the runtime idles until shut down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SourceExhausted<'a> {
    pub identity: &'a RuntimeIdentity,
    pub total_messages: u64,
}

impl Display for SourceExhausted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source {} exhausted after {} messages",
            self.identity, self.total_messages
        )
    }
}

impl StructuredLog for SourceExhausted<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            total_messages = self.total_messages,
            "{}", self
        );
    }
}

/// Delayed-response operator result forwarded.
///
/// # Log Level
/// `debug!` - Per-window detail
pub struct ResultsFlushed<'a> {
    pub identity: &'a RuntimeIdentity,
    pub strategy: &'a str,
    pub window_messages: u64,
    pub results: usize,
}

impl Display for ResultsFlushed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Runtime {} flushed {} results for a window of {} messages ({})",
            self.identity, self.results, self.window_messages, self.strategy
        )
    }
}

impl StructuredLog for ResultsFlushed<'_> {
    fn log(&self) {
        tracing::debug!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            strategy = self.strategy,
            window_messages = self.window_messages,
            results = self.results,
            "{}", self
        );
    }
}

/// One teardown step failed; the remaining steps still run.
///
/// # Log Level
/// `warn!` - Degraded shutdown
pub struct ShutdownStepFailed<'a> {
    pub identity: &'a RuntimeIdentity,
    pub step: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ShutdownStepFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Runtime {} failed to shut down {}: {}",
            self.identity, self.step, self.error
        )
    }
}

impl StructuredLog for ShutdownStepFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            step = self.step,
            error = %self.error,
            "{}", self
        );
    }
}

/// A task did not finish within the shutdown timeout and was aborted.
///
/// # Log Level
/// `warn!` - Degraded shutdown
pub struct TaskShutdownTimedOut<'a> {
    pub identity: &'a RuntimeIdentity,
    pub task: &'a str,
    pub timeout: Duration,
}

impl Display for TaskShutdownTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Runtime {} {} task did not stop within {:?}, aborting",
            self.identity, self.task, self.timeout
        )
    }
}

impl StructuredLog for TaskShutdownTimedOut<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.identity.node_id(),
            pipeline_id = self.identity.pipeline_id(),
            component_id = self.identity.component_id(),
            task = self.task,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }
}
