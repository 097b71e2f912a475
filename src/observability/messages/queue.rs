// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for streaming message queue events.
//!
//! * Queue storage setup and teardown
//! * Failed inserts and reads
//! * Wait strategy resolution

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// Queue log opened and wait strategy bound.
///
/// # Log Level
/// `debug!` - Assembly detail
pub struct QueueInitialized<'a> {
    pub queue_id: &'a str,
    pub wait_strategy: &'a str,
    pub directory: &'a Path,
}

impl Display for QueueInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Queue '{}' initialized at {} with {} wait strategy",
            self.queue_id,
            self.directory.display(),
            self.wait_strategy
        )
    }
}

impl StructuredLog for QueueInitialized<'_> {
    fn log(&self) {
        tracing::debug!(
            queue_id = self.queue_id,
            wait_strategy = self.wait_strategy,
            directory = %self.directory.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "queue",
            span_name = name,
            queue_id = self.queue_id,
            wait_strategy = self.wait_strategy,
        )
    }
}

/// A queue operation failed; the affected message is dropped.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use spqr_pipeline::observability::messages::queue::QueueOperationFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// let msg = QueueOperationFailed {
///     queue_id: "raw",
///     operation: "insert",
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Queue 'raw' insert failed: disk full");
/// ```
pub struct QueueOperationFailed<'a> {
    pub queue_id: &'a str,
    pub operation: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for QueueOperationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Queue '{}' {} failed: {}", self.queue_id, self.operation, self.error)
    }
}

impl StructuredLog for QueueOperationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            queue_id = self.queue_id,
            operation = self.operation,
            error = %self.error,
            "{}", self
        );
    }
}

/// Queue closed.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct QueueShutdown<'a> {
    pub queue_id: &'a str,
    pub deleted: bool,
}

impl Display for QueueShutdown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.deleted {
            write!(f, "Queue '{}' shut down and storage deleted", self.queue_id)
        } else {
            write!(f, "Queue '{}' shut down", self.queue_id)
        }
    }
}

impl StructuredLog for QueueShutdown<'_> {
    fn log(&self) {
        tracing::debug!(queue_id = self.queue_id, deleted = self.deleted, "{}", self);
    }
}

/// Configured queue wait strategy is unknown.
///
/// # Log Level
/// `warn!` - Configuration problem with a fallback
pub struct UnknownQueueWaitStrategy<'a> {
    pub requested: &'a str,
    pub fallback: &'a str,
}

impl Display for UnknownQueueWaitStrategy<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unknown queue wait strategy '{}', falling back to '{}'",
            self.requested, self.fallback
        )
    }
}

impl StructuredLog for UnknownQueueWaitStrategy<'_> {
    fn log(&self) {
        tracing::warn!(requested = self.requested, fallback = self.fallback, "{}", self);
    }
}
