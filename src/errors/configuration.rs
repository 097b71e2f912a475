// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while turning configuration into live queues and components.

use crate::config::ComponentType;
use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing settings detected while initializing a queue or component.
///
/// Fatal to the component being initialized; assembly of the surrounding
/// pipeline is aborted and rolled back.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required queue identifier")]
    MissingQueueId,

    #[error("failed to open durable log for queue '{queue_id}' at '{}': {source}", path.display())]
    QueueStorage {
        queue_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required component identifier")]
    MissingComponentId,

    #[error("component '{component_id}' is missing required setting '{setting}'")]
    MissingSetting {
        component_id: String,
        setting: String,
    },

    #[error("component '{component_id}' has an invalid value for '{setting}': {reason}")]
    InvalidSetting {
        component_id: String,
        setting: String,
        reason: String,
    },

    #[error("no component registered as '{name}' version '{version}'")]
    UnknownComponent { name: String, version: String },

    #[error("component '{component_id}' is declared as {declared:?} but '{name}' implements {actual:?}")]
    ComponentTypeMismatch {
        component_id: String,
        name: String,
        declared: ComponentType,
        actual: ComponentType,
    },

    #[error("unknown response wait strategy '{0}'")]
    UnknownWaitStrategy(String),

    #[error("failed to read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
