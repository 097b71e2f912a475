// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::consts::{DEFAULT_MAX_MESSAGES, MAX_MESSAGES_SETTING};
use crate::config::ComponentSettings;
use crate::errors::ConfigurationError;
use crate::traits::{DelayedResponseCollector, DelayedResponseWaitStrategy};

/// Requests a flush once `maxMessages` messages were processed since the last one.
#[derive(Debug)]
pub struct MessageCountResponseWaitStrategy {
    max_messages: u64,
    collector: Option<DelayedResponseCollector>,
}

impl MessageCountResponseWaitStrategy {
    pub const NAME: &'static str = "messageCount";

    pub fn new() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            collector: None,
        }
    }

    pub fn with_max_messages(max_messages: u64) -> Self {
        Self {
            max_messages,
            collector: None,
        }
    }

    pub fn max_messages(&self) -> u64 {
        self.max_messages
    }
}

impl Default for MessageCountResponseWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DelayedResponseWaitStrategy for MessageCountResponseWaitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        if !settings.contains_key(MAX_MESSAGES_SETTING) {
            return Ok(());
        }
        match settings.get_u64(MAX_MESSAGES_SETTING) {
            Some(max) if max > 0 => {
                self.max_messages = max;
                Ok(())
            }
            _ => Err(ConfigurationError::InvalidSetting {
                component_id: Self::NAME.to_string(),
                setting: MAX_MESSAGES_SETTING.to_string(),
                reason: "expected a positive integer".to_string(),
            }),
        }
    }

    fn set_delayed_response_collector(&mut self, collector: DelayedResponseCollector) {
        self.collector = Some(collector);
    }

    async fn run(&mut self) {
        let max_messages = self.max_messages;
        let Some(collector) = self.collector.as_mut() else {
            warn!(strategy = Self::NAME, "no delayed response collector set; not running");
            return;
        };

        let shutdown = collector.shutdown_token();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                changed = collector.changed() => {
                    if !changed {
                        break;
                    }
                    if collector.messages_since_last_flush() >= max_messages {
                        collector.retrieve_messages();
                    }
                }
            }
        }
        debug!(strategy = Self::NAME, "response wait strategy stopped");
    }
}
