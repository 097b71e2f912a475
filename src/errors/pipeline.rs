// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{ConfigurationError, MicroPipelineValidationResult, MissingInputError, ValidationError};
use thiserror::Error;

/// Failure to assemble or register a micro pipeline. Nothing of the
/// pipeline is left running when one of these is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("queue '{queue_id}' failed to initialize: {source}")]
    QueueInitialization {
        queue_id: String,
        #[source]
        source: ConfigurationError,
    },

    #[error("component '{component_id}' failed to initialize: {source}")]
    ComponentInitialization {
        component_id: String,
        #[source]
        source: ConfigurationError,
    },

    #[error("runtime for component '{component_id}' could not be built: {source}")]
    Runtime {
        component_id: String,
        #[source]
        source: MissingInputError,
    },

    #[error("pipeline '{0}' already exists")]
    AlreadyExists(String),
}

impl PipelineError {
    /// Map onto the result enum reported back to remote callers
    pub fn validation_result(&self) -> MicroPipelineValidationResult {
        match self {
            PipelineError::Validation(e) => e.result,
            PipelineError::QueueInitialization { .. } => {
                MicroPipelineValidationResult::QueueInitializationFailed
            }
            PipelineError::ComponentInitialization { .. } => {
                MicroPipelineValidationResult::ComponentInitializationFailed
            }
            PipelineError::AlreadyExists(_) => MicroPipelineValidationResult::PipelineAlreadyExists,
            PipelineError::Configuration(_) | PipelineError::Runtime { .. } => {
                MicroPipelineValidationResult::TechnicalError
            }
        }
    }
}
