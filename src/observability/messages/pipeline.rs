// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for micro pipeline assembly and lifecycle events.
//!
//! * Assembly, rollback and start
//! * Shutdown and replacement
//! * Statistics collection

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Queues and components of a pipeline created.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineAssembled<'a> {
    pub node_id: &'a str,
    pub pipeline_id: &'a str,
    pub queues: usize,
    pub components: usize,
}

impl Display for PipelineAssembled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Assembled pipeline '{}' with {} queues and {} components",
            self.pipeline_id, self.queues, self.components
        )
    }
}

impl StructuredLog for PipelineAssembled<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.node_id,
            pipeline_id = self.pipeline_id,
            queues = self.queues,
            components = self.components,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            node_id = self.node_id,
            pipeline_id = self.pipeline_id,
        )
    }
}

/// Assembly failed; nothing of the pipeline is left behind.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use spqr_pipeline::observability::messages::pipeline::PipelineAssemblyFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "no such component");
/// let msg = PipelineAssemblyFailed {
///     node_id: "node-1",
///     pipeline_id: "prices",
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Failed to assemble pipeline 'prices': no such component");
/// ```
pub struct PipelineAssemblyFailed<'a> {
    pub node_id: &'a str,
    pub pipeline_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PipelineAssemblyFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to assemble pipeline '{}': {}", self.pipeline_id, self.error)
    }
}

impl StructuredLog for PipelineAssemblyFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.node_id,
            pipeline_id = self.pipeline_id,
            error = %self.error,
            "{}", self
        );
    }
}

/// Partially assembled queues and components released after a failure.
///
/// # Log Level
/// `warn!` - Recovered failure
pub struct AssemblyRolledBack<'a> {
    pub pipeline_id: &'a str,
    pub queues: usize,
    pub components: usize,
}

impl Display for AssemblyRolledBack<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rolled back pipeline '{}': released {} queues and {} components",
            self.pipeline_id, self.queues, self.components
        )
    }
}

impl StructuredLog for AssemblyRolledBack<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline_id = self.pipeline_id,
            queues = self.queues,
            components = self.components,
            "{}", self
        );
    }
}

/// A component could not be released cleanly while rolling back.
///
/// # Log Level
/// `warn!` - Degraded cleanup
pub struct ComponentReleaseFailed<'a> {
    pub pipeline_id: &'a str,
    pub component_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ComponentReleaseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to release component '{}' of pipeline '{}': {}",
            self.component_id, self.pipeline_id, self.error
        )
    }
}

impl StructuredLog for ComponentReleaseFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline_id = self.pipeline_id,
            component_id = self.component_id,
            error = %self.error,
            "{}", self
        );
    }
}

/// Every runtime and the statistics collector launched.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStarted<'a> {
    pub pipeline_id: &'a str,
    pub runtimes: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Started pipeline '{}' with {} runtimes", self.pipeline_id, self.runtimes)
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::info!(pipeline_id = self.pipeline_id, runtimes = self.runtimes, "{}", self);
    }
}

/// Runtimes stopped and queues closed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineShutdown<'a> {
    pub pipeline_id: &'a str,
    pub runtimes_stopped: usize,
    pub queues_closed: usize,
}

impl Display for PipelineShutdown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Shut down pipeline '{}': {} runtimes stopped, {} queues closed",
            self.pipeline_id, self.runtimes_stopped, self.queues_closed
        )
    }
}

impl StructuredLog for PipelineShutdown<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline_id = self.pipeline_id,
            runtimes_stopped = self.runtimes_stopped,
            queues_closed = self.queues_closed,
            "{}", self
        );
    }
}

/// A running pipeline is replaced by a new configuration with the same id.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineReplaced<'a> {
    pub pipeline_id: &'a str,
}

impl Display for PipelineReplaced<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Replacing running pipeline '{}'", self.pipeline_id)
    }
}

impl StructuredLog for PipelineReplaced<'_> {
    fn log(&self) {
        tracing::info!(pipeline_id = self.pipeline_id, "{}", self);
    }
}

/// Periodic view over the pipeline's runtime statistics.
///
/// # Log Level
/// `debug!` - Periodic detail
pub struct StatisticsSummary<'a> {
    pub pipeline_id: &'a str,
    pub components: usize,
    pub total_messages: u64,
    pub processing_errors: u64,
    pub records_received: u64,
}

impl Display for StatisticsSummary<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}': {} components reported {} messages, {} errors",
            self.pipeline_id, self.components, self.total_messages, self.processing_errors
        )
    }
}

impl StructuredLog for StatisticsSummary<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline_id = self.pipeline_id,
            components = self.components,
            total_messages = self.total_messages,
            processing_errors = self.processing_errors,
            records_received = self.records_received,
            "{}", self
        );
    }
}

/// A stats record could not be decoded and was skipped.
///
/// # Log Level
/// `warn!` - Dropped diagnostic data
pub struct StatisticsRecordSkipped<'a> {
    pub pipeline_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StatisticsRecordSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping undecodable statistics record of pipeline '{}': {}",
            self.pipeline_id, self.error
        )
    }
}

impl StructuredLog for StatisticsRecordSkipped<'_> {
    fn log(&self) {
        tracing::warn!(pipeline_id = self.pipeline_id, error = %self.error, "{}", self);
    }
}
