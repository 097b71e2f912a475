// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue '{0}' has been shut down")]
    Closed(String),

    #[error("i/o error on queue '{queue_id}': {source}")]
    Io {
        queue_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in queue '{queue_id}': {reason}")]
    Corrupt { queue_id: String, reason: String },
}

/// Outcome of waiting on a queue that did not produce a message.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The wait was cut short by a shutdown. Callers treat it as a benign wake.
    #[error("wait interrupted")]
    Interrupted,

    #[error(transparent)]
    Queue(#[from] QueueError),
}
