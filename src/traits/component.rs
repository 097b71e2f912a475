// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::fmt;

use crate::config::{ComponentSettings, ComponentType};
use crate::errors::{ConfigurationError, ProcessingError};
use crate::message::StreamingDataMessage;

/// Produces messages from outside the pipeline.
#[async_trait]
pub trait Source: Send {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError>;

    /// Next message, or `None` once the source is exhausted.
    async fn next_message(&mut self) -> Result<Option<StreamingDataMessage>, ProcessingError>;

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        Ok(())
    }
}

/// Transforms each incoming message into zero or more outgoing messages.
#[async_trait]
pub trait DirectResponseOperator: Send {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError>;

    async fn on_message(
        &mut self,
        message: StreamingDataMessage,
    ) -> Result<Vec<StreamingDataMessage>, ProcessingError>;

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        Ok(())
    }
}

/// Accumulates state across messages and hands out a result set on request.
///
/// `get_result` returns everything accumulated since the previous call and
/// starts a fresh, empty window.
#[async_trait]
pub trait DelayedResponseOperator: Send {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError>;

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError>;

    fn get_result(&mut self) -> Result<Vec<StreamingDataMessage>, ProcessingError>;

    fn messages_since_last_result(&self) -> u64;

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        Ok(())
    }
}

/// Terminal component; consumes messages and writes nothing downstream.
#[async_trait]
pub trait Emitter: Send {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError>;

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError>;

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        Ok(())
    }
}

/// A component instance as produced by the registry. The variant decides
/// which runtime environment hosts it.
pub enum Component {
    Source(Box<dyn Source>),
    DirectResponse(Box<dyn DirectResponseOperator>),
    DelayedResponse(Box<dyn DelayedResponseOperator>),
    Emitter(Box<dyn Emitter>),
}

impl Component {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Component::Source(_) => ComponentType::Source,
            Component::DirectResponse(_) => ComponentType::DirectResponseOperator,
            Component::DelayedResponse(_) => ComponentType::DelayedResponseOperator,
            Component::Emitter(_) => ComponentType::Emitter,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Component::Source(c) => c.name(),
            Component::DirectResponse(c) => c.name(),
            Component::DelayedResponse(c) => c.name(),
            Component::Emitter(c) => c.name(),
        }
    }

    pub fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        match self {
            Component::Source(c) => c.initialize(id, settings),
            Component::DirectResponse(c) => c.initialize(id, settings),
            Component::DelayedResponse(c) => c.initialize(id, settings),
            Component::Emitter(c) => c.initialize(id, settings),
        }
    }

    /// Release the component's resources outside of a runtime, used when
    /// assembly is rolled back.
    pub async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        match self {
            Component::Source(c) => c.shutdown().await,
            Component::DirectResponse(c) => c.shutdown().await,
            Component::DelayedResponse(c) => c.shutdown().await,
            Component::Emitter(c) => c.shutdown().await,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.component_type())
            .field("name", &self.name())
            .finish()
    }
}
