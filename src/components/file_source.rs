// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Source emitting one message per line of a text file.
//!
//! # Settings
//! * `file` - path of the file to read (required, must be a readable file)
//! * `skipEmptyLines` - do not emit blank lines (default `false`)

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::config::ComponentSettings;
use crate::errors::{ConfigurationError, ProcessingError};
use crate::message::StreamingDataMessage;
use crate::traits::Source;

pub const FILE_SETTING: &str = "file";
pub const SKIP_EMPTY_LINES_SETTING: &str = "skipEmptyLines";

#[derive(Debug, Default)]
pub struct FileLineSource {
    path: Option<PathBuf>,
    skip_empty_lines: bool,
    lines: Option<Lines<BufReader<File>>>,
    exhausted: bool,
}

impl FileLineSource {
    pub const NAME: &'static str = "fileLineSource";
    pub const VERSION: &'static str = "0.0.1";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Source for FileLineSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        let path = settings
            .get_str(FILE_SETTING)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigurationError::MissingSetting {
                component_id: id.to_string(),
                setting: FILE_SETTING.to_string(),
            })?;
        let path = PathBuf::from(path);
        let invalid = |reason: String| ConfigurationError::InvalidSetting {
            component_id: id.to_string(),
            setting: FILE_SETTING.to_string(),
            reason,
        };
        let metadata = std::fs::metadata(&path)
            .map_err(|e| invalid(format!("cannot access '{}': {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(invalid(format!("'{}' is not a regular file", path.display())));
        }
        std::fs::File::open(&path).map_err(|e| invalid(format!("cannot open '{}': {}", path.display(), e)))?;

        self.path = Some(path);
        self.skip_empty_lines = settings.get_bool(SKIP_EMPTY_LINES_SETTING).unwrap_or(false);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<StreamingDataMessage>, ProcessingError> {
        if self.exhausted {
            return Ok(None);
        }
        if self.lines.is_none() {
            let path = self
                .path
                .as_ref()
                .ok_or_else(|| ProcessingError::Failed("source has not been initialized".to_string()))?;
            let file = File::open(path).await?;
            self.lines = Some(BufReader::new(file).lines());
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        loop {
            match lines.next_line().await? {
                Some(line) if self.skip_empty_lines && line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(StreamingDataMessage::now(line))),
                None => {
                    self.exhausted = true;
                    self.lines = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), ProcessingError> {
        self.lines = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source_for(content: &str, skip_empty: bool) -> (NamedTempFile, FileLineSource) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();

        let mut settings = ComponentSettings::new();
        settings.insert(FILE_SETTING, file.path().to_string_lossy().to_string());
        settings.insert(SKIP_EMPTY_LINES_SETTING, skip_empty);

        let mut source = FileLineSource::new();
        source.initialize("lines", &settings).unwrap();
        (file, source)
    }

    #[tokio::test]
    async fn test_emits_each_line_then_exhausts() {
        let (_file, mut source) = source_for("one\ntwo\n\nthree", false);

        let mut bodies = Vec::new();
        while let Some(message) = source.next_message().await.unwrap() {
            bodies.push(String::from_utf8(message.into_body()).unwrap());
        }
        assert_eq!(bodies, vec!["one", "two", "", "three"]);
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skips_empty_lines() {
        let (_file, mut source) = source_for("one\n\n  \ntwo\n", true);

        assert_eq!(source.next_message().await.unwrap().unwrap().body(), b"one");
        assert_eq!(source.next_message().await.unwrap().unwrap().body(), b"two");
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[test]
    fn test_missing_file_setting() {
        let mut source = FileLineSource::new();
        let result = source.initialize("lines", &ComponentSettings::new());
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingSetting { setting, .. }) if setting == FILE_SETTING
        ));
    }

    #[test]
    fn test_missing_file_rejected_at_initialize() {
        let mut settings = ComponentSettings::new();
        settings.insert(FILE_SETTING, "/definitely/not/here.txt");
        let mut source = FileLineSource::new();

        assert!(matches!(
            source.initialize("lines", &settings),
            Err(ConfigurationError::InvalidSetting { setting, .. }) if setting == FILE_SETTING
        ));
    }

    #[test]
    fn test_directory_rejected_at_initialize() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = ComponentSettings::new();
        settings.insert(FILE_SETTING, dir.path().to_string_lossy().to_string());
        let mut source = FileLineSource::new();

        assert!(matches!(
            source.initialize("lines", &settings),
            Err(ConfigurationError::InvalidSetting { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_removed_after_initialize_is_processing_error() {
        let (file, mut source) = source_for("one\n", false);
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        assert!(matches!(source.next_message().await, Err(ProcessingError::Io(_))));
    }
}
