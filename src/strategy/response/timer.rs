// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::consts::{DEFAULT_WAIT_TIME_MS, WAIT_TIME_SETTING};
use crate::config::ComponentSettings;
use crate::errors::ConfigurationError;
use crate::traits::{DelayedResponseCollector, DelayedResponseWaitStrategy};

/// Requests a flush every `waitTime` milliseconds. Windows in which no message
/// arrived are skipped.
#[derive(Debug)]
pub struct TimerBasedResponseWaitStrategy {
    wait_time: Duration,
    collector: Option<DelayedResponseCollector>,
}

impl TimerBasedResponseWaitStrategy {
    pub const NAME: &'static str = "timer";

    pub fn new() -> Self {
        Self::with_wait_time(Duration::from_millis(DEFAULT_WAIT_TIME_MS))
    }

    pub fn with_wait_time(wait_time: Duration) -> Self {
        Self {
            wait_time,
            collector: None,
        }
    }

    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }
}

impl Default for TimerBasedResponseWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DelayedResponseWaitStrategy for TimerBasedResponseWaitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        if !settings.contains_key(WAIT_TIME_SETTING) {
            return Ok(());
        }
        match settings.get_u64(WAIT_TIME_SETTING) {
            Some(ms) if ms > 0 => {
                self.wait_time = Duration::from_millis(ms);
                Ok(())
            }
            _ => Err(ConfigurationError::InvalidSetting {
                component_id: Self::NAME.to_string(),
                setting: WAIT_TIME_SETTING.to_string(),
                reason: "expected a positive number of milliseconds".to_string(),
            }),
        }
    }

    fn set_delayed_response_collector(&mut self, collector: DelayedResponseCollector) {
        self.collector = Some(collector);
    }

    async fn run(&mut self) {
        let wait_time = self.wait_time;
        let Some(collector) = self.collector.as_ref() else {
            warn!(strategy = Self::NAME, "no delayed response collector set; not running");
            return;
        };

        loop {
            tokio::select! {
                biased;
                _ = collector.shutdown_requested() => break,
                _ = tokio::time::sleep(wait_time) => {
                    if collector.messages_since_last_flush() > 0 {
                        collector.retrieve_messages();
                    }
                }
            }
        }
        debug!(strategy = Self::NAME, "response wait strategy stopped");
    }
}
