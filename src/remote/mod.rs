// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Payloads and client seam for instantiating pipelines on a processing node.
//!
//! A node answers instantiation and update calls with a
//! [`MicroPipelineInstantiationResponse`] and shutdown calls with a
//! [`MicroPipelineShutdownResponse`]. Clients validate a configuration before
//! sending it, so a structurally broken pipeline never leaves the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use crate::config::{validate_pipeline, MicroPipelineConfiguration};
use crate::engine::MicroPipelineManager;
use crate::errors::{ConnectivityError, MicroPipelineValidationResult, PipelineError};

pub use crate::engine::ShutdownState;

/// Answer to an instantiate or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroPipelineInstantiationResponse {
    #[serde(rename = "pipelineId")]
    pub pid: String,
    pub state: MicroPipelineValidationResult,
    #[serde(rename = "message")]
    pub msg: String,
}

impl MicroPipelineInstantiationResponse {
    pub fn new(pid: impl Into<String>, state: MicroPipelineValidationResult, msg: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            state,
            msg: msg.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state.is_ok()
    }

    fn from_outcome(pid: &str, outcome: Result<String, PipelineError>) -> Self {
        match outcome {
            Ok(pid) => Self::new(pid, MicroPipelineValidationResult::Ok, ""),
            Err(e) => Self::new(pid, e.validation_result(), e.to_string()),
        }
    }
}

/// Answer to a shutdown call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroPipelineShutdownResponse {
    #[serde(rename = "pipelineId")]
    pub pid: String,
    pub state: ShutdownState,
    #[serde(rename = "message")]
    pub msg: String,
}

impl MicroPipelineShutdownResponse {
    pub fn new(pid: impl Into<String>, state: ShutdownState, msg: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            state,
            msg: msg.into(),
        }
    }
}

/// Starts, replaces and stops pipelines on a processing node.
///
/// A `ConnectivityError` means the node could not be reached; the state of
/// the pipeline on that node is then unknown.
#[async_trait]
pub trait PipelineInstantiationClient: Send + Sync {
    async fn instantiate_pipeline(
        &self,
        config: &MicroPipelineConfiguration,
    ) -> Result<MicroPipelineInstantiationResponse, ConnectivityError>;

    async fn update_pipeline(
        &self,
        config: &MicroPipelineConfiguration,
    ) -> Result<MicroPipelineInstantiationResponse, ConnectivityError>;

    async fn shutdown_pipeline(&self, pipeline_id: &str) -> Result<MicroPipelineShutdownResponse, ConnectivityError>;
}

/// Answer locally when the configuration is invalid.
fn rejected(config: &MicroPipelineConfiguration) -> Option<MicroPipelineInstantiationResponse> {
    validate_pipeline(config)
        .err()
        .map(|e| MicroPipelineInstantiationResponse::new(config.id.trim(), e.result, e.to_string()))
}

/// In-process client driving a [`MicroPipelineManager`] of the same process.
///
/// Holds the manager weakly; once the node has been dropped every call fails
/// with a [`ConnectivityError`].
#[derive(Debug, Clone)]
pub struct LocalNodeClient {
    endpoint: String,
    manager: Weak<MicroPipelineManager>,
}

impl LocalNodeClient {
    pub fn new(manager: &Arc<MicroPipelineManager>) -> Self {
        Self {
            endpoint: format!("local://{}", manager.node_id()),
            manager: Arc::downgrade(manager),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn manager(&self) -> Result<Arc<MicroPipelineManager>, ConnectivityError> {
        self.manager.upgrade().ok_or_else(|| ConnectivityError {
            endpoint: self.endpoint.clone(),
            reason: "node is no longer running".to_string(),
        })
    }
}

#[async_trait]
impl PipelineInstantiationClient for LocalNodeClient {
    async fn instantiate_pipeline(
        &self,
        config: &MicroPipelineConfiguration,
    ) -> Result<MicroPipelineInstantiationResponse, ConnectivityError> {
        if let Some(response) = rejected(config) {
            return Ok(response);
        }
        let manager = self.manager()?;
        let outcome = manager.execute_pipeline(config).await;
        Ok(MicroPipelineInstantiationResponse::from_outcome(config.id.trim(), outcome))
    }

    async fn update_pipeline(
        &self,
        config: &MicroPipelineConfiguration,
    ) -> Result<MicroPipelineInstantiationResponse, ConnectivityError> {
        if let Some(response) = rejected(config) {
            return Ok(response);
        }
        let manager = self.manager()?;
        let outcome = manager.update_pipeline(config).await;
        Ok(MicroPipelineInstantiationResponse::from_outcome(config.id.trim(), outcome))
    }

    async fn shutdown_pipeline(&self, pipeline_id: &str) -> Result<MicroPipelineShutdownResponse, ConnectivityError> {
        let manager = self.manager()?;
        let state = manager.shutdown_pipeline(pipeline_id).await;
        let msg = match state {
            ShutdownState::Ok => String::new(),
            other => format!("pipeline '{}' not shut down: {}", pipeline_id.trim(), other),
        };
        Ok(MicroPipelineShutdownResponse::new(pipeline_id.trim(), state, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ComponentConfiguration, ComponentRegistry, ComponentType, StreamingMessageQueueConfiguration,
    };
    use tempfile::TempDir;

    fn log_pipeline(dir: &TempDir, id: &str) -> MicroPipelineConfiguration {
        let lines = dir.path().join("lines.txt");
        std::fs::write(&lines, "first\nsecond\n").unwrap();
        MicroPipelineConfiguration {
            id: id.to_string(),
            queues: vec![StreamingMessageQueueConfiguration::new("lines").with_base_path(dir.path())],
            components: vec![
                ComponentConfiguration::new("read", ComponentType::Source, "fileLineSource", "0.0.1")
                    .to_queue("lines")
                    .with_setting("file", lines.to_string_lossy().to_string()),
                ComponentConfiguration::new("log", ComponentType::Emitter, "logEmitter", "0.0.1")
                    .from_queue("lines"),
            ],
            stats_collection_timer: None,
        }
    }

    fn node() -> Arc<MicroPipelineManager> {
        Arc::new(MicroPipelineManager::new(
            "node-1",
            Arc::new(ComponentRegistry::with_builtin_components()),
        ))
    }

    #[tokio::test]
    async fn test_invalid_configuration_answered_locally() {
        let client = LocalNodeClient::new(&node());
        let mut config = MicroPipelineConfiguration::default();
        config.id = " ".to_string();

        // the node is already gone; validation must answer without reaching it
        let response = client.instantiate_pipeline(&config).await.unwrap();
        assert_eq!(response.state, MicroPipelineValidationResult::MissingPipelineId);
        assert!(!response.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_instantiate_update_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let manager = node();
        let client = LocalNodeClient::new(&manager);
        let config = log_pipeline(&dir, "logs");

        let response = client.instantiate_pipeline(&config).await.unwrap();
        assert!(response.is_ok(), "{}", response.msg);
        assert_eq!(response.pid, "logs");

        let duplicate = client.instantiate_pipeline(&config).await.unwrap();
        assert_eq!(duplicate.state, MicroPipelineValidationResult::PipelineAlreadyExists);

        let updated = client.update_pipeline(&config).await.unwrap();
        assert!(updated.is_ok());

        let stopped = client.shutdown_pipeline("logs").await.unwrap();
        assert_eq!(stopped.state, ShutdownState::Ok);
        let missing = client.shutdown_pipeline("logs").await.unwrap();
        assert_eq!(missing.state, ShutdownState::NonExistingPipeline);
    }

    #[tokio::test]
    async fn test_dropped_node_is_connectivity_error() {
        let dir = TempDir::new().unwrap();
        let client = LocalNodeClient::new(&node());

        let error = client.instantiate_pipeline(&log_pipeline(&dir, "logs")).await.unwrap_err();
        assert_eq!(error.endpoint, "local://node-1");
        assert!(client.shutdown_pipeline("logs").await.is_err());
    }

    #[test]
    fn test_response_wire_names() {
        let response = MicroPipelineInstantiationResponse::new(
            "prices",
            MicroPipelineValidationResult::UnknownToQueue,
            "component 'agg' writes to unknown queue",
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pipelineId"], "prices");
        assert_eq!(json["state"], "UNKNOWN_TO_QUEUE");
        assert_eq!(json["message"], "component 'agg' writes to unknown queue");

        let shutdown: MicroPipelineShutdownResponse =
            serde_json::from_str(r#"{"pipelineId":"p","state":"PIPELINE_ID_MISSING","message":""}"#).unwrap();
        assert_eq!(shutdown.state, ShutdownState::PipelineIdMissing);
    }
}
