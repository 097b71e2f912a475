// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod registry;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, parse_config, ComponentConfiguration, ComponentSettings,
    ComponentType, ConfigFormat, MicroPipelineConfiguration, QueueDurability,
    StreamingMessageQueueConfiguration,
};
pub use registry::ComponentRegistry;
pub use validation::{stats_queue_id, validate_pipeline};
