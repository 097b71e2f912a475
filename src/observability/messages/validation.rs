// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for rejected pipeline configurations.

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// Configuration failed validation; the pipeline is not built.
///
/// # Log Level
/// `warn!` - Caller error
///
/// # Example
/// ```
/// use spqr_pipeline::errors::{MicroPipelineValidationResult, ValidationError};
/// use spqr_pipeline::observability::messages::validation::ValidationRejected;
///
/// let error = ValidationError::new(
///     MicroPipelineValidationResult::UnknownFromQueue,
///     "component 'agg' reads from unknown queue 'nope'",
/// )
/// .with_reference("nope");
/// let msg = ValidationRejected {
///     pipeline_id: "prices",
///     error: &error,
/// };
///
/// assert!(msg.to_string().starts_with("Rejected pipeline 'prices': UNKNOWN_FROM_QUEUE"));
/// ```
pub struct ValidationRejected<'a> {
    pub pipeline_id: &'a str,
    pub error: &'a ValidationError,
}

impl Display for ValidationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rejected pipeline '{}': {}", self.pipeline_id, self.error)
    }
}

impl StructuredLog for ValidationRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline_id = self.pipeline_id,
            result = self.error.result.as_str(),
            reference = self.error.reference.as_deref().unwrap_or_default(),
            "{}", self
        );
    }
}
