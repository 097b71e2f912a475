// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic text lives in [`messages`]. Message types follow a
//! struct-based pattern with a `Display` implementation to:
//!
//! * Keep log text out of the processing code
//! * Attach the same correlation fields (node, pipeline, component, queue) everywhere
//! * Give each event one fixed level
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::pipeline` - Assembly, lifecycle and statistics of micro pipelines
//! * `messages::queue` - Queue storage and wait strategy events
//! * `messages::runtime` - Component runtime lifecycle and per-message failures
//! * `messages::validation` - Rejected pipeline configurations
//!
//! The library never installs a subscriber; the `spqr-node` binary does.
//!
//! # Usage
//!
//! ```rust
//! use spqr_pipeline::observability::messages::pipeline::PipelineStarted;
//! use spqr_pipeline::observability::messages::StructuredLog;
//!
//! PipelineStarted {
//!     pipeline_id: "prices",
//!     runtimes: 3,
//! }
//! .log();
//! ```

pub mod messages;
