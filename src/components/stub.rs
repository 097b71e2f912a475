// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stub components for runtime and pipeline tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::ComponentSettings;
use crate::errors::{ConfigurationError, ProcessingError};
use crate::message::StreamingDataMessage;
use crate::traits::{DelayedResponseOperator, DirectResponseOperator, Emitter, Source};

/// Hands out a fixed list of messages, then reports exhaustion.
pub struct VecSource {
    messages: VecDeque<StreamingDataMessage>,
}

impl VecSource {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            messages: bodies
                .into_iter()
                .enumerate()
                .map(|(i, body)| StreamingDataMessage::new(body, i as i64))
                .collect(),
        }
    }
}

#[async_trait]
impl Source for VecSource {
    fn name(&self) -> &'static str {
        "vecSource"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<StreamingDataMessage>, ProcessingError> {
        Ok(self.messages.pop_front())
    }
}

/// Upper-cases each body. A body of `fail` is a processing error.
#[derive(Default)]
pub struct UppercaseOperator;

#[async_trait]
impl DirectResponseOperator for UppercaseOperator {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn on_message(
        &mut self,
        message: StreamingDataMessage,
    ) -> Result<Vec<StreamingDataMessage>, ProcessingError> {
        if message.body() == b"fail" {
            return Err(ProcessingError::Failed("asked to fail".to_string()));
        }
        let upper = message.body().to_ascii_uppercase();
        Ok(vec![StreamingDataMessage::new(upper, message.timestamp())])
    }
}

/// Records every message it receives into a shared buffer.
#[derive(Clone, Default)]
pub struct CollectingEmitter {
    received: Arc<Mutex<Vec<StreamingDataMessage>>>,
    shut_down: Arc<Mutex<bool>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|m| String::from_utf8_lossy(m.body()).to_string())
            .collect()
    }

    pub fn was_shut_down(&self) -> bool {
        *self.shut_down.lock().unwrap()
    }
}

#[async_trait]
impl Emitter for CollectingEmitter {
    fn name(&self) -> &'static str {
        "collectingEmitter"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError> {
        self.received.lock().unwrap().push(message);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        *self.shut_down.lock().unwrap() = true;
        Ok(())
    }
}

/// Counts messages per window and answers with the count as body.
#[derive(Clone, Default)]
pub struct CountingAggregator {
    window: u64,
    results_taken: Arc<Mutex<u64>>,
}

impl CountingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often `get_result` produced a non-empty result.
    pub fn results_taken(&self) -> u64 {
        *self.results_taken.lock().unwrap()
    }
}

#[async_trait]
impl DelayedResponseOperator for CountingAggregator {
    fn name(&self) -> &'static str {
        "countingAggregator"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn on_message(&mut self, _message: StreamingDataMessage) -> Result<(), ProcessingError> {
        self.window += 1;
        Ok(())
    }

    fn get_result(&mut self) -> Result<Vec<StreamingDataMessage>, ProcessingError> {
        let window = std::mem::take(&mut self.window);
        if window == 0 {
            return Ok(Vec::new());
        }
        *self.results_taken.lock().unwrap() += 1;
        Ok(vec![StreamingDataMessage::now(window.to_string())])
    }

    fn messages_since_last_result(&self) -> u64 {
        self.window
    }
}

/// Answers each window with its message bodies joined by `,`.
#[derive(Clone, Default)]
pub struct WindowRecorder {
    window: Vec<String>,
    received: Arc<Mutex<u64>>,
}

impl WindowRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted across every window so far.
    pub fn received(&self) -> u64 {
        *self.received.lock().unwrap()
    }
}

#[async_trait]
impl DelayedResponseOperator for WindowRecorder {
    fn name(&self) -> &'static str {
        "windowRecorder"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError> {
        self.window.push(String::from_utf8_lossy(message.body()).to_string());
        *self.received.lock().unwrap() += 1;
        Ok(())
    }

    fn get_result(&mut self) -> Result<Vec<StreamingDataMessage>, ProcessingError> {
        let window = std::mem::take(&mut self.window);
        if window.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![StreamingDataMessage::now(window.join(","))])
    }

    fn messages_since_last_result(&self) -> u64 {
        self.window.len() as u64
    }
}

/// Fails every call to `next_message`, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingSource {
    attempts: Arc<Mutex<u64>>,
}

impl FailingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Source for FailingSource {
    fn name(&self) -> &'static str {
        "failingSource"
    }

    fn initialize(&mut self, _id: &str, _settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<StreamingDataMessage>, ProcessingError> {
        *self.attempts.lock().unwrap() += 1;
        Err(ProcessingError::Failed("backing store unavailable".to_string()))
    }
}
