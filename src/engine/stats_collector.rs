// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::QueueError;
use crate::observability::messages::pipeline::{StatisticsRecordSkipped, StatisticsSummary};
use crate::observability::messages::StructuredLog;
use crate::queue::StreamingMessageQueueConsumer;
use crate::runtime::ComponentStatistics;

/// Latest statistics snapshot of every runtime in a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroPipelineStatistics {
    pub pipeline_id: String,
    pub components: BTreeMap<String, ComponentStatistics>,
    pub records_received: u64,
}

impl MicroPipelineStatistics {
    pub fn new(pipeline_id: &str) -> Self {
        Self {
            pipeline_id: pipeline_id.to_string(),
            ..Default::default()
        }
    }

    /// Fold a snapshot in; an older snapshot never replaces a newer one.
    pub fn record(&mut self, snapshot: ComponentStatistics) {
        self.records_received += 1;
        match self.components.get(&snapshot.component_id) {
            Some(latest) if latest.timestamp > snapshot.timestamp => {}
            _ => {
                self.components.insert(snapshot.component_id.clone(), snapshot);
            }
        }
    }

    pub fn component(&self, component_id: &str) -> Option<&ComponentStatistics> {
        self.components.get(component_id)
    }

    pub fn total_messages(&self) -> u64 {
        self.components.values().map(|s| s.total_messages).sum()
    }

    pub fn processing_errors(&self) -> u64 {
        self.components.values().map(|s| s.processing_errors).sum()
    }
}

/// Drains a pipeline's stats queue into a shared [`MicroPipelineStatistics`] view.
#[derive(Debug)]
pub struct StatisticsCollector {
    pipeline_id: String,
    consumer: Arc<StreamingMessageQueueConsumer>,
    view: Arc<RwLock<MicroPipelineStatistics>>,
    interval: Duration,
}

impl StatisticsCollector {
    pub fn new(pipeline_id: &str, consumer: Arc<StreamingMessageQueueConsumer>, interval: Duration) -> Self {
        Self {
            pipeline_id: pipeline_id.to_string(),
            consumer,
            view: Arc::new(RwLock::new(MicroPipelineStatistics::new(pipeline_id))),
            interval,
        }
    }

    pub fn view(&self) -> Arc<RwLock<MicroPipelineStatistics>> {
        self.view.clone()
    }

    /// Fold every record currently in the stats queue into the view.
    /// Returns the number of records folded in.
    pub fn drain(&self) -> usize {
        let mut snapshots = Vec::new();
        loop {
            match self.consumer.next() {
                Ok(Some(message)) => match ComponentStatistics::from_message(&message) {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(e) => StatisticsRecordSkipped {
                        pipeline_id: &self.pipeline_id,
                        error: &e,
                    }
                    .log(),
                },
                Ok(None) | Err(QueueError::Closed(_)) => break,
                Err(e @ QueueError::Corrupt { .. }) => StatisticsRecordSkipped {
                    pipeline_id: &self.pipeline_id,
                    error: &e,
                }
                .log(),
                Err(e) => {
                    StatisticsRecordSkipped {
                        pipeline_id: &self.pipeline_id,
                        error: &e,
                    }
                    .log();
                    break;
                }
            }
        }

        let drained = snapshots.len();
        if drained > 0 {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            snapshots.into_iter().for_each(|snapshot| view.record(snapshot));
        }
        drained
    }

    fn log_summary(&self) {
        let view = self.view.read().unwrap_or_else(|e| e.into_inner());
        StatisticsSummary {
            pipeline_id: &self.pipeline_id,
            components: view.components.len(),
            total_messages: view.total_messages(),
            processing_errors: view.processing_errors(),
            records_received: view.records_received,
        }
        .log();
    }

    /// Drain on every interval until cancelled, then drain one last time.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = crate::runtime::stats_ticker(self.interval);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.drain();
                    self.log_summary();
                }
            }
        }
        self.drain();
        self.log_summary();
    }
}
