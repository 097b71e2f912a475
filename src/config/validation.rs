// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of micro pipeline configurations.
//!
//! A configuration is checked before any queue or component is built, so a
//! rejected configuration never leaves anything behind. Validation is fail-fast:
//! the first violation found is reported as a [`ValidationError`] carrying the
//! matching [`MicroPipelineValidationResult`] and the offending id.
//!
//! # Validation Pipeline
//!
//! 1. **Pipeline**: the pipeline id must be present
//! 2. **Queues**: at least one queue, every id present and unique, no clash
//!    with the reserved statistics queue id
//! 3. **Components**: at least one component, every id present and unique,
//!    implementation name, version and a known type present
//! 4. **Wiring**: each component has the queue references its type requires and
//!    every reference resolves to a declared queue
//! 5. **Ownership**: no queue has more than one producer or more than one consumer
//!
//! Ids are compared after trimming, matching how runtimes normalise them.
//!
//! # Example
//! ```
//! use spqr_pipeline::config::{validate_pipeline, MicroPipelineConfiguration};
//! use spqr_pipeline::errors::MicroPipelineValidationResult;
//!
//! let config = MicroPipelineConfiguration::default();
//! let error = validate_pipeline(&config).unwrap_err();
//! assert_eq!(error.result, MicroPipelineValidationResult::MissingPipelineId);
//! ```

use crate::config::consts::STATS_QUEUE_SUFFIX;
use crate::config::{ComponentConfiguration, ComponentType, MicroPipelineConfiguration};
use crate::errors::{MicroPipelineValidationResult, ValidationError};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Validates a pipeline configuration, returning the first violation found.
pub fn validate_pipeline(config: &MicroPipelineConfiguration) -> Result<(), ValidationError> {
    validate_pipeline_id(config)?;
    let queue_ids = validate_queues(config)?;
    validate_components(config)?;
    validate_wiring(config, &queue_ids)?;
    validate_queue_ownership(config)?;
    Ok(())
}

/// Identifier of the internal statistics queue for a pipeline
pub fn stats_queue_id(pipeline_id: &str) -> String {
    format!("{}{}", pipeline_id.trim().to_lowercase(), STATS_QUEUE_SUFFIX)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validate_pipeline_id(config: &MicroPipelineConfiguration) -> Result<(), ValidationError> {
    if is_blank(&config.id) {
        return Err(ValidationError::new(
            MicroPipelineValidationResult::MissingPipelineId,
            "pipeline configuration has no id",
        ));
    }
    Ok(())
}

fn validate_queues(config: &MicroPipelineConfiguration) -> Result<HashSet<String>, ValidationError> {
    if config.queues.is_empty() {
        return Err(ValidationError::new(
            MicroPipelineValidationResult::MissingQueues,
            format!("pipeline '{}' declares no queues", config.id),
        ));
    }

    let reserved = stats_queue_id(&config.id);
    let mut seen = HashSet::new();
    for queue in &config.queues {
        if is_blank(&queue.id) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::MissingQueueId,
                format!("pipeline '{}' declares a queue without an id", config.id),
            ));
        }
        let id = queue.id.trim().to_string();
        if id.to_lowercase() == reserved {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::NonUniqueQueueId,
                format!("queue id '{}' is reserved for pipeline statistics", id),
            )
            .with_reference(id));
        }
        if !seen.insert(id.clone()) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::NonUniqueQueueId,
                format!("queue id '{}' is declared more than once", id),
            )
            .with_reference(id));
        }
    }
    Ok(seen)
}

fn validate_components(config: &MicroPipelineConfiguration) -> Result<(), ValidationError> {
    if config.components.is_empty() {
        return Err(ValidationError::new(
            MicroPipelineValidationResult::MissingComponents,
            format!("pipeline '{}' declares no components", config.id),
        ));
    }

    let mut seen = HashSet::new();
    for component in &config.components {
        if is_blank(&component.id) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::MissingComponentId,
                format!("pipeline '{}' declares a component without an id", config.id),
            ));
        }
        let id = component.id.trim();
        if !seen.insert(id.to_string()) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::NonUniqueComponentId,
                format!("component id '{}' is declared more than once", id),
            )
            .with_reference(id));
        }
        if is_blank(&component.name) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::MissingComponentName,
                format!("component '{}' names no implementation", id),
            )
            .with_reference(id));
        }
        if is_blank(&component.version) {
            return Err(ValidationError::new(
                MicroPipelineValidationResult::MissingComponentVersion,
                format!("component '{}' names no implementation version", id),
            )
            .with_reference(id));
        }
        match component.component_type.as_deref() {
            None => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::MissingComponentType,
                    format!("component '{}' has no type", id),
                )
                .with_reference(id))
            }
            Some(raw) if is_blank(raw) => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::MissingComponentType,
                    format!("component '{}' has no type", id),
                )
                .with_reference(id))
            }
            Some(raw) => {
                if let Err(reason) = ComponentType::from_str(raw) {
                    return Err(ValidationError::new(
                        MicroPipelineValidationResult::UnknownComponentType,
                        format!("component '{}': {}", id, reason),
                    )
                    .with_reference(id));
                }
            }
        }
    }
    Ok(())
}

fn queue_reference(reference: &Option<String>) -> Option<&str> {
    reference.as_deref().map(str::trim).filter(|r| !r.is_empty())
}

fn validate_wiring(
    config: &MicroPipelineConfiguration,
    queue_ids: &HashSet<String>,
) -> Result<(), ValidationError> {
    for component in &config.components {
        let id = component.id.trim();
        // type presence and validity was checked in the component stage
        let Some(kind) = component.kind() else {
            continue;
        };

        match queue_reference(&component.from_queue) {
            None if kind.requires_from_queue() => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::MissingFromQueue,
                    format!("{} component '{}' has no source queue", kind, id),
                )
                .with_reference(id));
            }
            Some(queue) if !queue_ids.contains(queue) => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::UnknownFromQueue,
                    format!("component '{}' reads from unknown queue '{}'", id, queue),
                )
                .with_reference(queue));
            }
            _ => {}
        }

        match queue_reference(&component.to_queue) {
            None if kind.requires_to_queue() => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::MissingToQueue,
                    format!("{} component '{}' has no destination queue", kind, id),
                )
                .with_reference(id));
            }
            Some(queue) if !queue_ids.contains(queue) => {
                return Err(ValidationError::new(
                    MicroPipelineValidationResult::UnknownToQueue,
                    format!("component '{}' writes to unknown queue '{}'", id, queue),
                )
                .with_reference(queue));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_queue_ownership(config: &MicroPipelineConfiguration) -> Result<(), ValidationError> {
    let mut producers: HashMap<&str, &str> = HashMap::new();
    let mut consumers: HashMap<&str, &str> = HashMap::new();

    for component in &config.components {
        let Some(kind) = component.kind() else {
            continue;
        };
        let id = component.id.trim();

        if kind.requires_to_queue() {
            if let Some(queue) = queue_reference(&component.to_queue) {
                if let Some(other) = producers.insert(queue, id) {
                    return Err(ownership_error(
                        MicroPipelineValidationResult::NonUniqueQueueProducer,
                        queue,
                        "written to",
                        other,
                        component,
                    ));
                }
            }
        }
        if kind.requires_from_queue() {
            if let Some(queue) = queue_reference(&component.from_queue) {
                if let Some(other) = consumers.insert(queue, id) {
                    return Err(ownership_error(
                        MicroPipelineValidationResult::NonUniqueQueueConsumer,
                        queue,
                        "read from",
                        other,
                        component,
                    ));
                }
            }
        }
    }
    Ok(())
}

fn ownership_error(
    result: MicroPipelineValidationResult,
    queue: &str,
    role: &str,
    first: &str,
    second: &ComponentConfiguration,
) -> ValidationError {
    ValidationError::new(
        result,
        format!(
            "queue '{}' is {} by both '{}' and '{}'",
            queue,
            role,
            first,
            second.id.trim()
        ),
    )
    .with_reference(queue)
}
