// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod configuration;
mod pipeline;
mod processing;
mod queue;
mod remote;
mod runtime;
mod validation;

pub use configuration::ConfigurationError;
pub use pipeline::PipelineError;
pub use processing::ProcessingError;
pub use queue::{QueueError, WaitError};
pub use remote::ConnectivityError;
pub use runtime::MissingInputError;
pub use validation::{MicroPipelineValidationResult, ValidationError};
