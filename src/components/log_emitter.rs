// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Emitter writing every message it receives to the log.
//!
//! # Settings
//! * `prefix` - text placed in front of each logged body (optional)

use async_trait::async_trait;

use crate::config::ComponentSettings;
use crate::errors::{ConfigurationError, ProcessingError};
use crate::message::StreamingDataMessage;
use crate::traits::Emitter;

pub const PREFIX_SETTING: &str = "prefix";

#[derive(Debug, Default)]
pub struct LogEmitter {
    id: String,
    prefix: String,
    emitted: u64,
}

impl LogEmitter {
    pub const NAME: &'static str = "logEmitter";
    pub const VERSION: &'static str = "0.0.1";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn render(&self, message: &StreamingDataMessage) -> String {
        format!("{}{}", self.prefix, String::from_utf8_lossy(message.body()))
    }
}

#[async_trait]
impl Emitter for LogEmitter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        self.id = id.to_string();
        self.prefix = settings.get_str(PREFIX_SETTING).unwrap_or_default().to_string();
        Ok(())
    }

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError> {
        self.emitted += 1;
        tracing::info!(
            component_id = %self.id,
            timestamp = message.timestamp(),
            "{}",
            self.render(&message)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renders_prefix_and_counts() {
        let mut settings = ComponentSettings::new();
        settings.insert(PREFIX_SETTING, "out: ");
        let mut emitter = LogEmitter::new();
        emitter.initialize("log", &settings).unwrap();

        let message = StreamingDataMessage::new("hello", 1);
        assert_eq!(emitter.render(&message), "out: hello");

        emitter.on_message(message).await.unwrap();
        emitter.on_message(StreamingDataMessage::new("again", 2)).await.unwrap();
        assert_eq!(emitter.emitted(), 2);
    }

    #[test]
    fn test_prefix_is_optional() {
        let mut emitter = LogEmitter::new();
        emitter.initialize("log", &ComponentSettings::new()).unwrap();
        assert_eq!(emitter.render(&StreamingDataMessage::new("x", 1)), "x");
    }
}
