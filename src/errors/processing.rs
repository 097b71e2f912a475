// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A single message could not be handled. Runtimes log it, drop the message
/// and keep going.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("malformed message body: {0}")]
    MalformedBody(String),

    #[error("failed to encode result: {0}")]
    Encoding(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}
