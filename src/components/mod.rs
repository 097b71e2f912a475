// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in components available to every node.

pub mod aggregator;
pub mod file_source;
pub mod log_emitter;

#[cfg(test)]
pub(crate) mod stub;

pub use aggregator::JsonContentAggregator;
pub use file_source::FileLineSource;
pub use log_emitter::LogEmitter;
