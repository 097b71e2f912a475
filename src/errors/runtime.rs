// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A runtime environment was constructed without one of its required
/// collaborators (operator, wait strategy, queue handles, identifiers).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required {missing}")]
pub struct MissingInputError {
    pub missing: &'static str,
}

impl MissingInputError {
    pub fn new(missing: &'static str) -> Self {
        Self { missing }
    }
}
