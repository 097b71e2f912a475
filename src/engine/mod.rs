// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Micro pipeline assembly and lifecycle.
//!
//! [`MicroPipelineFactory`] turns a validated configuration into a
//! [`MicroPipeline`]; [`MicroPipelineManager`] keeps the running pipelines of
//! a node and starts, replaces and stops them by id.

pub mod factory;
pub mod manager;
pub mod micro_pipeline;
pub mod stats_collector;


pub use factory::MicroPipelineFactory;
pub use manager::{MicroPipelineManager, ShutdownState};
pub use micro_pipeline::{MicroPipeline, PipelineState};
pub use stats_collector::{MicroPipelineStatistics, StatisticsCollector};
