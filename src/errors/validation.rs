// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outcome of validating a pipeline configuration, also used as the `state`
/// of an instantiation response. Anything other than `Ok` means the pipeline
/// was not built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MicroPipelineValidationResult {
    Ok,
    MissingPipelineId,
    MissingQueues,
    MissingQueueId,
    NonUniqueQueueId,
    MissingComponents,
    MissingComponentId,
    NonUniqueComponentId,
    MissingComponentName,
    MissingComponentVersion,
    MissingComponentType,
    UnknownComponentType,
    MissingFromQueue,
    UnknownFromQueue,
    MissingToQueue,
    UnknownToQueue,
    NonUniqueQueueProducer,
    NonUniqueQueueConsumer,
    PipelineAlreadyExists,
    QueueInitializationFailed,
    ComponentInitializationFailed,
    TechnicalError,
}

impl MicroPipelineValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, MicroPipelineValidationResult::Ok)
    }

    /// Wire name, e.g. `UNKNOWN_FROM_QUEUE`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MissingPipelineId => "MISSING_PIPELINE_ID",
            Self::MissingQueues => "MISSING_QUEUES",
            Self::MissingQueueId => "MISSING_QUEUE_ID",
            Self::NonUniqueQueueId => "NON_UNIQUE_QUEUE_ID",
            Self::MissingComponents => "MISSING_COMPONENTS",
            Self::MissingComponentId => "MISSING_COMPONENT_ID",
            Self::NonUniqueComponentId => "NON_UNIQUE_COMPONENT_ID",
            Self::MissingComponentName => "MISSING_COMPONENT_NAME",
            Self::MissingComponentVersion => "MISSING_COMPONENT_VERSION",
            Self::MissingComponentType => "MISSING_COMPONENT_TYPE",
            Self::UnknownComponentType => "UNKNOWN_COMPONENT_TYPE",
            Self::MissingFromQueue => "MISSING_FROM_QUEUE",
            Self::UnknownFromQueue => "UNKNOWN_FROM_QUEUE",
            Self::MissingToQueue => "MISSING_TO_QUEUE",
            Self::UnknownToQueue => "UNKNOWN_TO_QUEUE",
            Self::NonUniqueQueueProducer => "NON_UNIQUE_QUEUE_PRODUCER",
            Self::NonUniqueQueueConsumer => "NON_UNIQUE_QUEUE_CONSUMER",
            Self::PipelineAlreadyExists => "PIPELINE_ALREADY_EXISTS",
            Self::QueueInitializationFailed => "QUEUE_INITIALIZATION_FAILED",
            Self::ComponentInitializationFailed => "COMPONENT_INITIALIZATION_FAILED",
            Self::TechnicalError => "TECHNICAL_ERROR",
        }
    }
}

impl fmt::Display for MicroPipelineValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural invariant of a pipeline configuration was violated.
///
/// Carries the first failure found. `reference` holds the offending id
/// (queue id, component id, or the unresolved queue reference) when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{result}: {detail}")]
pub struct ValidationError {
    pub result: MicroPipelineValidationResult,
    pub reference: Option<String>,
    pub detail: String,
}

impl ValidationError {
    pub fn new(result: MicroPipelineValidationResult, detail: impl Into<String>) -> Self {
        Self {
            result,
            reference: None,
            detail: detail.into(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}
