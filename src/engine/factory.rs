// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use super::micro_pipeline::MicroPipeline;
use crate::config::consts::TASK_SHUTDOWN_TIMEOUT_MS;
use crate::config::{
    stats_queue_id, validate_pipeline, ComponentConfiguration, ComponentRegistry,
    MicroPipelineConfiguration, StreamingMessageQueueConfiguration,
};
use crate::errors::{MissingInputError, PipelineError};
use crate::observability::messages::pipeline::{
    AssemblyRolledBack, ComponentReleaseFailed, PipelineAssembled, PipelineAssemblyFailed,
};
use crate::observability::messages::validation::ValidationRejected;
use crate::observability::messages::StructuredLog;
use crate::queue::StreamingMessageQueue;
use crate::runtime::{ComponentRuntime, RuntimeEnvironmentBuilder};
use crate::strategy::queue::DirectPassWaitStrategy;
use crate::strategy::response::wait_strategy_for_settings;
use crate::traits::Component;

/// Turns a pipeline configuration into an assembled, not yet started [`MicroPipeline`].
///
/// Assembly validates the configuration, opens every queue plus the internal
/// stats queue, instantiates each component from the registry and wraps it in
/// the runtime environment matching its type. If any step fails, everything
/// created so far is released again before the error is returned.
#[derive(Debug, Clone)]
pub struct MicroPipelineFactory {
    node_id: String,
    registry: Arc<ComponentRegistry>,
    handle: Option<Handle>,
    flush_on_shutdown: bool,
    shutdown_timeout: Duration,
}

/// Everything created while assembling, released again on failure.
#[derive(Default)]
struct Assembly {
    queues: Vec<StreamingMessageQueue>,
    stats_queue: Option<StreamingMessageQueue>,
    runtimes: Vec<Box<dyn ComponentRuntime>>,
}

impl Assembly {
    async fn roll_back(mut self, pipeline_id: &str) {
        let components = self.runtimes.len();
        for runtime in self.runtimes.iter_mut() {
            runtime.shutdown().await;
        }
        let mut queues = self.queues.len();
        self.queues.iter().for_each(|queue| {
            queue.shutdown();
        });
        if let Some(stats_queue) = self.stats_queue.take() {
            stats_queue.shutdown();
            queues += 1;
        }
        AssemblyRolledBack {
            pipeline_id,
            queues,
            components,
        }
        .log();
    }
}

async fn release_component(pipeline_id: &str, config: &ComponentConfiguration, mut component: Component) {
    if let Err(e) = component.shutdown().await {
        ComponentReleaseFailed {
            pipeline_id,
            component_id: &config.id,
            error: &e,
        }
        .log();
    }
}

/// Host `component` in the runtime `builder` describes. A component that
/// cannot be hosted is shut down before the error is returned.
async fn build_runtime(
    pipeline_id: &str,
    config: &ComponentConfiguration,
    builder: RuntimeEnvironmentBuilder,
    component: Component,
) -> Result<Box<dyn ComponentRuntime>, PipelineError> {
    if let Some(source) = builder.missing_input_for(component.component_type()) {
        release_component(pipeline_id, config, component).await;
        return Err(PipelineError::Runtime {
            component_id: config.id.clone(),
            source,
        });
    }
    builder
        .with_component(component)
        .build()
        .map_err(|source| PipelineError::Runtime {
            component_id: config.id.clone(),
            source,
        })
}

impl MicroPipelineFactory {
    pub fn new(node_id: impl Into<String>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            node_id: node_id.into(),
            registry,
            handle: None,
            flush_on_shutdown: true,
            shutdown_timeout: Duration::from_millis(TASK_SHUTDOWN_TIMEOUT_MS),
        }
    }

    /// Spawn pipeline tasks on `handle` instead of the ambient runtime.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Whether delayed-response runtimes forward their last partial window on shutdown.
    pub fn with_flush_on_shutdown(mut self, flush: bool) -> Self {
        self.flush_on_shutdown = flush;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Validate and assemble a pipeline. Nothing is left behind on failure.
    pub async fn instantiate(&self, config: &MicroPipelineConfiguration) -> Result<MicroPipeline, PipelineError> {
        if let Err(e) = validate_pipeline(config) {
            ValidationRejected {
                pipeline_id: config.id.trim(),
                error: &e,
            }
            .log();
            return Err(e.into());
        }

        let pipeline_id = config.id.trim();
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| PipelineError::Runtime {
                component_id: pipeline_id.to_string(),
                source: MissingInputError::new("task runtime"),
            })?,
        };

        let mut assembly = Assembly::default();
        match self.assemble(config, &handle, &mut assembly).await {
            Ok(()) => {
                let Some(stats_queue) = assembly.stats_queue.take() else {
                    assembly.roll_back(pipeline_id).await;
                    return Err(PipelineError::Runtime {
                        component_id: pipeline_id.to_string(),
                        source: MissingInputError::new("statistics queue"),
                    });
                };
                PipelineAssembled {
                    node_id: &self.node_id,
                    pipeline_id,
                    queues: assembly.queues.len(),
                    components: assembly.runtimes.len(),
                }
                .log();
                Ok(MicroPipeline::new(
                    pipeline_id,
                    &self.node_id,
                    assembly.queues,
                    stats_queue,
                    assembly.runtimes,
                    config.get_stats_collection_interval(),
                    handle,
                    self.shutdown_timeout,
                ))
            }
            Err(e) => {
                PipelineAssemblyFailed {
                    node_id: &self.node_id,
                    pipeline_id,
                    error: &e,
                }
                .log();
                assembly.roll_back(pipeline_id).await;
                Err(e)
            }
        }
    }

    async fn assemble(
        &self,
        config: &MicroPipelineConfiguration,
        handle: &Handle,
        assembly: &mut Assembly,
    ) -> Result<(), PipelineError> {
        let pipeline_id = config.id.trim();

        let mut queue_index = HashMap::new();
        for queue_config in &config.queues {
            let queue = StreamingMessageQueue::initialize(queue_config).map_err(|source| {
                PipelineError::QueueInitialization {
                    queue_id: queue_config.id.clone(),
                    source,
                }
            })?;
            queue_index.insert(queue.id().to_string(), assembly.queues.len());
            assembly.queues.push(queue);
        }

        let stats_config = self.stats_queue_configuration(config);
        let stats_queue = StreamingMessageQueue::initialize(&stats_config).map_err(|source| {
            PipelineError::QueueInitialization {
                queue_id: stats_config.id.clone(),
                source,
            }
        })?;
        let stats_producer = stats_queue.producer();
        assembly.stats_queue = Some(stats_queue);

        let lookup = |reference: &Option<String>| {
            reference
                .as_deref()
                .map(str::trim)
                .and_then(|id| queue_index.get(id))
                .map(|index| &assembly.queues[*index])
        };

        for component_config in &config.components {
            let component = self.registry.instantiate(component_config).map_err(|source| {
                PipelineError::ComponentInitialization {
                    component_id: component_config.id.clone(),
                    source,
                }
            })?;

            let mut builder = RuntimeEnvironmentBuilder::new()
                .with_node_id(&self.node_id)
                .with_pipeline_id(pipeline_id)
                .with_component_id(component_config.id.trim())
                .with_stats_producer(stats_producer.clone())
                .with_stats_interval(config.get_stats_collection_interval())
                .with_handle(handle.clone())
                .with_flush_on_shutdown(self.flush_on_shutdown)
                .with_shutdown_timeout(self.shutdown_timeout);

            if let Some(queue) = lookup(&component_config.from_queue) {
                builder = builder.with_consumer(queue.consumer());
            }
            if let Some(queue) = lookup(&component_config.to_queue) {
                builder = builder.with_producer(queue.producer());
            }
            if let Component::DelayedResponse(_) = component {
                match wait_strategy_for_settings(component_config.id.trim(), &component_config.settings) {
                    Ok(strategy) => builder = builder.with_response_wait_strategy(strategy),
                    Err(source) => {
                        release_component(pipeline_id, component_config, component).await;
                        return Err(PipelineError::ComponentInitialization {
                            component_id: component_config.id.clone(),
                            source,
                        });
                    }
                }
            }

            let runtime = build_runtime(pipeline_id, component_config, builder, component).await?;
            assembly.runtimes.push(runtime);
        }
        Ok(())
    }

    /// DirectPass queue named `<pipelineId>-stats`, stored beside the first
    /// configured queue and removed on shutdown.
    fn stats_queue_configuration(&self, config: &MicroPipelineConfiguration) -> StreamingMessageQueueConfiguration {
        let stats = StreamingMessageQueueConfiguration::new(stats_queue_id(&config.id))
            .with_wait_strategy(DirectPassWaitStrategy::NAME)
            .with_delete_on_shutdown(true);
        match config.queues.first() {
            Some(queue) => stats.with_base_path(queue.durability.get_base_path()),
            None => stats,
        }
    }
}
