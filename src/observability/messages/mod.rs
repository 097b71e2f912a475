// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable text and
//! [`StructuredLog`] to emit itself at its level with the identifiers needed
//! to correlate it (node, pipeline, component or queue).
//!
//! # Organization
//!
//! * `pipeline` - Assembly, lifecycle and statistics of micro pipelines
//! * `queue` - Queue storage and wait strategy events
//! * `runtime` - Component runtime lifecycle and per-message failures
//! * `validation` - Rejected pipeline configurations
//!
//! # Usage Pattern
//!
//! ```rust
//! use spqr_pipeline::observability::messages::queue::QueueShutdown;
//! use spqr_pipeline::observability::messages::StructuredLog;
//!
//! QueueShutdown {
//!     queue_id: "raw",
//!     deleted: true,
//! }
//! .log();
//! ```

use tracing::Span;

pub mod pipeline;
pub mod queue;
pub mod runtime;
pub mod validation;

/// A log event that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the event.
    fn log(&self);

    /// A span carrying the event's identifiers, for instrumenting the work it describes.
    fn span(&self, name: &str) -> Span {
        tracing::info_span!("event", span_name = name)
    }
}
