// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ComponentType;
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueueProducer;

/// Counter snapshot of one runtime, written to the pipeline's stats queue as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatistics {
    pub component_id: String,
    pub component_type: ComponentType,
    pub total_messages: u64,
    pub messages_since_last_snapshot: u64,
    pub processing_errors: u64,
    pub min_duration_micros: u64,
    pub max_duration_micros: u64,
    pub avg_duration_micros: u64,
    /// Snapshot time, ms since epoch
    pub timestamp: i64,
}

impl ComponentStatistics {
    pub fn to_message(&self) -> Result<StreamingDataMessage, serde_json::Error> {
        Ok(StreamingDataMessage::new(serde_json::to_vec(self)?, self.timestamp))
    }

    pub fn from_message(message: &StreamingDataMessage) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(message.body())
    }
}

/// Per-runtime counters. Only the owning runtime task writes to it.
#[derive(Debug)]
pub struct StatisticsRecorder {
    component_id: String,
    component_type: ComponentType,
    producer: Arc<StreamingMessageQueueProducer>,
    interval: Duration,
    total_messages: u64,
    window_messages: u64,
    processing_errors: u64,
    min_micros: u64,
    max_micros: u64,
    sum_micros: u64,
}

impl StatisticsRecorder {
    pub fn new(
        component_id: &str,
        component_type: ComponentType,
        producer: Arc<StreamingMessageQueueProducer>,
        interval: Duration,
    ) -> Self {
        Self {
            component_id: component_id.to_string(),
            component_type,
            producer,
            interval,
            total_messages: 0,
            window_messages: 0,
            processing_errors: 0,
            min_micros: 0,
            max_micros: 0,
            sum_micros: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages
    }

    pub fn processing_errors(&self) -> u64 {
        self.processing_errors
    }

    pub fn record_message(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        if self.window_messages == 0 || micros < self.min_micros {
            self.min_micros = micros;
        }
        self.max_micros = self.max_micros.max(micros);
        self.sum_micros = self.sum_micros.saturating_add(micros);
        self.window_messages += 1;
        self.total_messages += 1;
    }

    pub fn record_error(&mut self) {
        self.processing_errors += 1;
    }

    pub fn snapshot(&self) -> ComponentStatistics {
        ComponentStatistics {
            component_id: self.component_id.clone(),
            component_type: self.component_type,
            total_messages: self.total_messages,
            messages_since_last_snapshot: self.window_messages,
            processing_errors: self.processing_errors,
            min_duration_micros: self.min_micros,
            max_duration_micros: self.max_micros,
            avg_duration_micros: self.sum_micros.checked_div(self.window_messages).unwrap_or(0),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Write a snapshot to the stats queue and start a new window.
    pub fn emit(&mut self) -> bool {
        let snapshot = self.snapshot();
        let inserted = match snapshot.to_message() {
            Ok(message) => self.producer.insert(&message),
            Err(e) => {
                tracing::warn!(component_id = %self.component_id, error = %e, "failed to encode statistics");
                false
            }
        };
        self.window_messages = 0;
        self.min_micros = 0;
        self.max_micros = 0;
        self.sum_micros = 0;
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamingMessageQueueConfiguration;
    use crate::queue::StreamingMessageQueue;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_tracks_window_and_totals() {
        let dir = TempDir::new().unwrap();
        let queue = StreamingMessageQueue::initialize(
            &StreamingMessageQueueConfiguration::new("stats")
                .with_wait_strategy("directPass")
                .with_base_path(dir.path()),
        )
        .unwrap();
        let mut recorder = StatisticsRecorder::new(
            "op",
            ComponentType::DirectResponseOperator,
            queue.producer(),
            Duration::from_millis(100),
        );

        recorder.record_message(Duration::from_micros(10));
        recorder.record_message(Duration::from_micros(30));
        recorder.record_error();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_messages, 2);
        assert_eq!(snapshot.messages_since_last_snapshot, 2);
        assert_eq!(snapshot.min_duration_micros, 10);
        assert_eq!(snapshot.max_duration_micros, 30);
        assert_eq!(snapshot.avg_duration_micros, 20);
        assert_eq!(snapshot.processing_errors, 1);

        assert!(recorder.emit());
        let written = ComponentStatistics::from_message(&queue.next().unwrap()).unwrap();
        assert_eq!(written.component_id, "op");
        assert_eq!(written.total_messages, 2);

        let next = recorder.snapshot();
        assert_eq!(next.total_messages, 2);
        assert_eq!(next.messages_since_last_snapshot, 0);
        assert_eq!(next.avg_duration_micros, 0);
    }

    #[test]
    fn test_statistics_json_is_camel_case() {
        let stats = ComponentStatistics {
            component_id: "src".to_string(),
            component_type: ComponentType::Source,
            total_messages: 1,
            messages_since_last_snapshot: 1,
            processing_errors: 0,
            min_duration_micros: 5,
            max_duration_micros: 5,
            avg_duration_micros: 5,
            timestamp: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["componentType"], "SOURCE");
        assert_eq!(json["messagesSinceLastSnapshot"], 1);
    }
}
