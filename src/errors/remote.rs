// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A remote pipeline call could not reach its node. The state of the
/// pipeline on that node is unknown.
#[derive(Debug, Clone, Error)]
#[error("failed to reach processing node at '{endpoint}': {reason}")]
pub struct ConnectivityError {
    pub endpoint: String,
    pub reason: String,
}
