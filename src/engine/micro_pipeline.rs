// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::stats_collector::{MicroPipelineStatistics, StatisticsCollector};
use crate::observability::messages::pipeline::{PipelineShutdown, PipelineStarted};
use crate::observability::messages::StructuredLog;
use crate::queue::StreamingMessageQueue;
use crate::runtime::{ComponentRuntime, RuntimeState};

/// Lifecycle state of a micro pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Assembling,
    Running,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Assembling => write!(f, "ASSEMBLING"),
            PipelineState::Running => write!(f, "RUNNING"),
            PipelineState::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            PipelineState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// An assembled pipeline: its queues, one runtime per component and the
/// statistics collector reading the internal stats queue.
///
/// Built by [`MicroPipelineFactory`](super::MicroPipelineFactory). Nothing runs
/// until [`start`](Self::start) is called.
pub struct MicroPipeline {
    id: String,
    node_id: String,
    state: PipelineState,
    queues: Vec<StreamingMessageQueue>,
    stats_queue: StreamingMessageQueue,
    runtimes: Vec<Box<dyn ComponentRuntime>>,
    statistics: Arc<RwLock<MicroPipelineStatistics>>,
    collector: Option<StatisticsCollector>,
    collector_cancel: CancellationToken,
    collector_task: Option<JoinHandle<()>>,
    handle: Handle,
    shutdown_timeout: Duration,
}

impl fmt::Debug for MicroPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicroPipeline")
            .field("id", &self.id)
            .field("node_id", &self.node_id)
            .field("state", &self.state)
            .field("queues", &self.queues.len())
            .field("runtimes", &self.runtimes.len())
            .finish()
    }
}

impl MicroPipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: &str,
        node_id: &str,
        queues: Vec<StreamingMessageQueue>,
        stats_queue: StreamingMessageQueue,
        runtimes: Vec<Box<dyn ComponentRuntime>>,
        stats_interval: Duration,
        handle: Handle,
        shutdown_timeout: Duration,
    ) -> Self {
        let collector = StatisticsCollector::new(id, stats_queue.consumer(), stats_interval);
        Self {
            id: id.to_string(),
            node_id: node_id.to_string(),
            state: PipelineState::Assembling,
            queues,
            stats_queue,
            runtimes,
            statistics: collector.view(),
            collector: Some(collector),
            collector_cancel: CancellationToken::new(),
            collector_task: None,
            handle,
            shutdown_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Launch every runtime and the statistics collector. `false` unless the
    /// pipeline was freshly assembled.
    pub fn start(&mut self) -> bool {
        if self.state != PipelineState::Assembling {
            return false;
        }

        let mut started = 0;
        for runtime in self.runtimes.iter_mut() {
            if runtime.start(&self.handle) {
                started += 1;
            }
        }

        if let Some(collector) = self.collector.take() {
            let span = tracing::debug_span!(
                "statistics_collector",
                node_id = %self.node_id,
                pipeline_id = %self.id,
            );
            let cancel = self.collector_cancel.clone();
            self.collector_task = Some(self.handle.spawn(collector.run(cancel).instrument(span)));
        }

        self.state = PipelineState::Running;
        PipelineStarted {
            pipeline_id: &self.id,
            runtimes: started,
        }
        .log();
        true
    }

    /// Stop every runtime, collect the final statistics and close every queue.
    ///
    /// Safe on a pipeline that never started. `false` if shutdown already ran.
    pub async fn shutdown(&mut self) -> bool {
        if matches!(self.state, PipelineState::ShuttingDown | PipelineState::Terminated) {
            return false;
        }
        self.state = PipelineState::ShuttingDown;

        let mut runtimes_stopped = 0;
        for runtime in self.runtimes.iter_mut() {
            if runtime.shutdown().await {
                runtimes_stopped += 1;
            }
        }

        self.collector_cancel.cancel();
        if let Some(mut task) = self.collector_task.take() {
            if tokio::time::timeout(self.shutdown_timeout, &mut task).await.is_err() {
                tracing::warn!(
                    pipeline_id = %self.id,
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "statistics collector did not stop in time, aborting"
                );
                task.abort();
            }
        } else if let Some(collector) = self.collector.take() {
            collector.drain();
        }

        let mut queues_closed = self.queues.iter().filter(|queue| queue.shutdown()).count();
        if self.stats_queue.shutdown() {
            queues_closed += 1;
        }

        self.state = PipelineState::Terminated;
        PipelineShutdown {
            pipeline_id: &self.id,
            runtimes_stopped,
            queues_closed,
        }
        .log();
        true
    }

    /// Latest statistics view collected from the runtimes.
    pub fn statistics(&self) -> MicroPipelineStatistics {
        self.statistics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Configured queues, without the internal stats queue.
    pub fn queues(&self) -> &[StreamingMessageQueue] {
        &self.queues
    }

    pub fn queue(&self, queue_id: &str) -> Option<&StreamingMessageQueue> {
        self.queues.iter().find(|queue| queue.id() == queue_id.trim())
    }

    pub fn stats_queue(&self) -> &StreamingMessageQueue {
        &self.stats_queue
    }

    /// (component id, state) of every runtime, in configuration order.
    pub fn runtime_states(&self) -> Vec<(String, RuntimeState)> {
        self.runtimes
            .iter()
            .map(|runtime| (runtime.identity().component_id().to_string(), runtime.state()))
            .collect()
    }
}
