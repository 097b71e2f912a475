// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Append-only, segmented message log backing a streaming message queue.
//!
//! The log lives in its own directory. Messages are stored one JSON document
//! per line in segment files named by a zero-padded sequence number
//! (`0000000000.log`, `0000000001.log`, ...). The writer rolls to the next
//! segment once the rolling interval has elapsed since the current one was
//! opened.
//!
//! The reader keeps its own position. A line is only handed out once its
//! terminating newline is visible, so a record that is still being written is
//! never returned half-way. Once the next segment exists the current one is
//! complete; the reader drains it one last time and moves on.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::QueueError;
use crate::message::StreamingDataMessage;

const SEGMENT_EXTENSION: &str = "log";

struct SegmentWriter {
    segment: u64,
    file: File,
    opened_at: Instant,
}

struct SegmentReader {
    segment: u64,
    file: Option<BufReader<File>>,
    pending: Vec<u8>,
}

pub struct DurableMessageLog {
    queue_id: String,
    directory: PathBuf,
    rolling_interval: Duration,
    writer: Mutex<SegmentWriter>,
    reader: Mutex<SegmentReader>,
    appended: AtomicU64,
    closed: AtomicBool,
}

fn segment_path(directory: &Path, segment: u64) -> PathBuf {
    directory.join(format!("{:010}.{}", segment, SEGMENT_EXTENSION))
}

fn existing_segments(directory: &Path) -> std::io::Result<Vec<u64>> {
    let mut segments: Vec<u64> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXTENSION))
        .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
        .collect();
    segments.sort_unstable();
    Ok(segments)
}

fn open_segment_for_append(directory: &Path, segment: u64) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(segment_path(directory, segment))
}

impl DurableMessageLog {
    /// Open the log in `directory`, creating it if needed.
    ///
    /// Segments left over from a previous run are kept and read again from
    /// the start; new messages go to a fresh segment after them.
    pub fn open(
        queue_id: &str,
        directory: PathBuf,
        rolling_interval: Duration,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(&directory)?;

        let segments = existing_segments(&directory)?;
        let first = segments.first().copied().unwrap_or(0);
        let write_segment = segments.last().map(|last| last + 1).unwrap_or(0);
        let file = open_segment_for_append(&directory, write_segment)?;

        Ok(Self {
            queue_id: queue_id.to_string(),
            directory,
            rolling_interval,
            writer: Mutex::new(SegmentWriter {
                segment: write_segment,
                file,
                opened_at: Instant::now(),
            }),
            reader: Mutex::new(SegmentReader {
                segment: first,
                file: None,
                pending: Vec::new(),
            }),
            appended: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of messages appended since the log was opened.
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Acquire)
    }

    fn io_error(&self, source: std::io::Error) -> QueueError {
        QueueError::Io {
            queue_id: self.queue_id.clone(),
            source,
        }
    }

    pub fn append(&self, message: &StreamingDataMessage) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed(self.queue_id.clone()));
        }

        let mut line = serde_json::to_vec(message).map_err(|e| QueueError::Corrupt {
            queue_id: self.queue_id.clone(),
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if writer.opened_at.elapsed() >= self.rolling_interval {
            let next = writer.segment + 1;
            writer.file = open_segment_for_append(&self.directory, next).map_err(|e| self.io_error(e))?;
            writer.segment = next;
            writer.opened_at = Instant::now();
        }
        writer.file.write_all(&line).map_err(|e| self.io_error(e))?;
        writer.file.flush().map_err(|e| self.io_error(e))?;
        drop(writer);

        self.appended.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Next complete record after the reader's position, or `None` if there
    /// is nothing new yet.
    pub fn read_next(&self) -> Result<Option<StreamingDataMessage>, QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed(self.queue_id.clone()));
        }

        let mut reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if reader.file.is_none() {
                match File::open(segment_path(&self.directory, reader.segment)) {
                    Ok(file) => reader.file = Some(BufReader::new(file)),
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(self.io_error(e)),
                }
            }

            if let Some(line) = self.read_line(&mut reader)? {
                return self.decode(&line).map(Some);
            }

            // end of the current segment; move on only once a successor exists
            let next = reader.segment + 1;
            if !segment_path(&self.directory, next).exists() {
                return Ok(None);
            }
            if let Some(line) = self.read_line(&mut reader)? {
                return self.decode(&line).map(Some);
            }

            let leftover = std::mem::take(&mut reader.pending);
            reader.segment = next;
            reader.file = None;
            if !leftover.is_empty() {
                return Err(QueueError::Corrupt {
                    queue_id: self.queue_id.clone(),
                    reason: format!("segment {} ends with an unterminated record", next - 1),
                });
            }
        }
    }

    fn read_line(&self, reader: &mut SegmentReader) -> Result<Option<Vec<u8>>, QueueError> {
        let SegmentReader { file, pending, .. } = reader;
        let Some(file) = file.as_mut() else {
            return Ok(None);
        };
        file.read_until(b'\n', pending).map_err(|e| self.io_error(e))?;
        if pending.last() == Some(&b'\n') {
            let mut line = std::mem::take(pending);
            line.pop();
            Ok(Some(line))
        } else {
            Ok(None)
        }
    }

    fn decode(&self, line: &[u8]) -> Result<StreamingDataMessage, QueueError> {
        serde_json::from_slice(line).map_err(|e| QueueError::Corrupt {
            queue_id: self.queue_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Close the log and optionally remove its directory. Only the first call
    /// has any effect.
    pub fn close(&self, delete: bool) -> Result<bool, QueueError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        {
            let mut reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
            reader.file = None;
            reader.pending.clear();
        }
        {
            let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
            writer.file.sync_all().map_err(|e| self.io_error(e))?;
        }

        if delete {
            match fs::remove_dir_all(&self.directory) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_log(dir: &TempDir, rolling: Duration) -> DurableMessageLog {
        DurableMessageLog::open("q", dir.path().join("q"), rolling).unwrap()
    }

    #[test]
    fn test_reads_back_in_append_order() {
        let dir = TempDir::new().unwrap();
        let log = open_log(&dir, Duration::from_secs(3600));

        for i in 0..5 {
            log.append(&StreamingDataMessage::new(format!("m{}", i), i)).unwrap();
        }

        for i in 0..5 {
            let message = log.read_next().unwrap().unwrap();
            assert_eq!(message.body(), format!("m{}", i).as_bytes());
        }
        assert!(log.read_next().unwrap().is_none());
        assert_eq!(log.appended(), 5);
    }

    #[test]
    fn test_partial_line_is_not_returned() {
        let dir = TempDir::new().unwrap();
        let log = open_log(&dir, Duration::from_secs(3600));

        let record = serde_json::to_vec(&StreamingDataMessage::new("late", 7)).unwrap();
        let (head, tail) = record.split_at(record.len() / 2);

        let mut raw = open_segment_for_append(log.directory(), 0).unwrap();
        raw.write_all(head).unwrap();
        raw.flush().unwrap();
        assert!(log.read_next().unwrap().is_none());

        raw.write_all(tail).unwrap();
        raw.write_all(b"\n").unwrap();
        raw.flush().unwrap();
        let message = log.read_next().unwrap().unwrap();
        assert_eq!(message.body(), b"late");
        assert_eq!(message.timestamp(), 7);
    }

    #[test]
    fn test_reader_follows_rolled_segments() {
        let dir = TempDir::new().unwrap();
        let log = open_log(&dir, Duration::ZERO);

        log.append(&StreamingDataMessage::new("a", 1)).unwrap();
        log.append(&StreamingDataMessage::new("b", 2)).unwrap();
        log.append(&StreamingDataMessage::new("c", 3)).unwrap();

        assert!(existing_segments(log.directory()).unwrap().len() >= 3);

        let bodies: Vec<Vec<u8>> = std::iter::from_fn(|| log.read_next().unwrap())
            .map(|m| m.into_body())
            .collect();
        assert_eq!(bodies, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_corrupt_record_is_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let log = open_log(&dir, Duration::from_secs(3600));

        let mut raw = open_segment_for_append(log.directory(), 0).unwrap();
        raw.write_all(b"not json\n").unwrap();
        raw.flush().unwrap();
        log.append(&StreamingDataMessage::new("ok", 1)).unwrap();

        assert!(matches!(log.read_next(), Err(QueueError::Corrupt { .. })));
        assert_eq!(log.read_next().unwrap().unwrap().body(), b"ok");
    }

    #[test]
    fn test_close_deletes_directory_once() {
        let dir = TempDir::new().unwrap();
        let log = open_log(&dir, Duration::from_secs(3600));
        log.append(&StreamingDataMessage::new("x", 1)).unwrap();

        assert!(log.close(true).unwrap());
        assert!(!log.directory().exists());
        assert!(!log.close(true).unwrap());

        assert!(matches!(
            log.append(&StreamingDataMessage::new("y", 2)),
            Err(QueueError::Closed(_))
        ));
        assert!(matches!(log.read_next(), Err(QueueError::Closed(_))));
    }

    #[test]
    fn test_reopen_replays_previous_segments() {
        let dir = TempDir::new().unwrap();
        {
            let log = open_log(&dir, Duration::from_secs(3600));
            log.append(&StreamingDataMessage::new("kept", 1)).unwrap();
            log.close(false).unwrap();
        }

        let log = open_log(&dir, Duration::from_secs(3600));
        log.append(&StreamingDataMessage::new("new", 2)).unwrap();

        assert_eq!(log.read_next().unwrap().unwrap().body(), b"kept");
        assert_eq!(log.read_next().unwrap().unwrap().body(), b"new");
        assert_eq!(log.appended(), 1);
    }
}
