// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::factory::MicroPipelineFactory;
use super::micro_pipeline::MicroPipeline;
use super::stats_collector::MicroPipelineStatistics;
use crate::config::{validate_pipeline, ComponentRegistry, MicroPipelineConfiguration};
use crate::errors::PipelineError;
use crate::observability::messages::pipeline::PipelineReplaced;
use crate::observability::messages::StructuredLog;

/// Outcome of shutting down a pipeline by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShutdownState {
    Ok,
    PipelineIdMissing,
    NonExistingPipeline,
    TechnicalError,
}

impl ShutdownState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownState::Ok => "OK",
            ShutdownState::PipelineIdMissing => "PIPELINE_ID_MISSING",
            ShutdownState::NonExistingPipeline => "NON_EXISTING_PIPELINE",
            ShutdownState::TechnicalError => "TECHNICAL_ERROR",
        }
    }
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the micro pipelines of one processing node, keyed by pipeline id.
#[derive(Debug)]
pub struct MicroPipelineManager {
    factory: MicroPipelineFactory,
    pipelines: Mutex<HashMap<String, MicroPipeline>>,
}

impl MicroPipelineManager {
    pub fn new(node_id: impl Into<String>, registry: Arc<ComponentRegistry>) -> Self {
        Self::with_factory(MicroPipelineFactory::new(node_id, registry))
    }

    pub fn with_factory(factory: MicroPipelineFactory) -> Self {
        Self {
            factory,
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        self.factory.node_id()
    }

    /// Assemble and start a new pipeline. Its id must not be in use yet.
    pub async fn execute_pipeline(&self, config: &MicroPipelineConfiguration) -> Result<String, PipelineError> {
        validate_pipeline(config)?;
        let pipeline_id = config.id.trim().to_string();

        let mut pipelines = self.pipelines.lock().await;
        if pipelines.contains_key(&pipeline_id) {
            return Err(PipelineError::AlreadyExists(pipeline_id));
        }
        let mut pipeline = self.factory.instantiate(config).await?;
        pipeline.start();
        pipelines.insert(pipeline_id.clone(), pipeline);
        Ok(pipeline_id)
    }

    /// Replace a running pipeline with the same id, or start it if there is none.
    ///
    /// The running pipeline is shut down before the new one is assembled, so
    /// both may use the same queue storage.
    pub async fn update_pipeline(&self, config: &MicroPipelineConfiguration) -> Result<String, PipelineError> {
        validate_pipeline(config)?;
        let pipeline_id = config.id.trim().to_string();

        let mut pipelines = self.pipelines.lock().await;
        if let Some(mut running) = pipelines.remove(&pipeline_id) {
            PipelineReplaced {
                pipeline_id: &pipeline_id,
            }
            .log();
            running.shutdown().await;
        }
        let mut pipeline = self.factory.instantiate(config).await?;
        pipeline.start();
        pipelines.insert(pipeline_id.clone(), pipeline);
        Ok(pipeline_id)
    }

    pub async fn shutdown_pipeline(&self, pipeline_id: &str) -> ShutdownState {
        let pipeline_id = pipeline_id.trim();
        if pipeline_id.is_empty() {
            return ShutdownState::PipelineIdMissing;
        }

        let removed = self.pipelines.lock().await.remove(pipeline_id);
        match removed {
            Some(mut pipeline) => {
                pipeline.shutdown().await;
                ShutdownState::Ok
            }
            None => ShutdownState::NonExistingPipeline,
        }
    }

    /// Ids of all running pipelines, sorted
    pub async fn pipeline_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pipelines.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn has_pipeline(&self, pipeline_id: &str) -> bool {
        self.pipelines.lock().await.contains_key(pipeline_id.trim())
    }

    pub async fn pipeline_statistics(&self, pipeline_id: &str) -> Option<MicroPipelineStatistics> {
        self.pipelines
            .lock()
            .await
            .get(pipeline_id.trim())
            .map(MicroPipeline::statistics)
    }

    /// Shut down every pipeline. Returns how many were stopped.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<MicroPipeline> = self.pipelines.lock().await.drain().map(|(_, p)| p).collect();
        let mut stopped = 0;
        for mut pipeline in drained {
            if pipeline.shutdown().await {
                stopped += 1;
            }
        }
        stopped
    }
}
