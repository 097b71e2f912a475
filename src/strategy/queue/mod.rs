// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod blocking;
mod direct_pass;
mod sleeping;

pub use blocking::BlockingWaitStrategy;
pub use direct_pass::DirectPassWaitStrategy;
pub use sleeping::SleepingWaitStrategy;

use std::sync::Arc;

use crate::observability::messages::queue::UnknownQueueWaitStrategy;
use crate::observability::messages::StructuredLog;
use crate::traits::QueueWaitStrategy;

/// Resolve a queue wait strategy by name, case-insensitively.
///
/// Unknown names fall back to [`BlockingWaitStrategy`] with a warning.
pub fn wait_strategy_for_name(name: &str) -> Arc<dyn QueueWaitStrategy> {
    let normalized = name.trim().to_ascii_lowercase();
    if normalized == BlockingWaitStrategy::NAME {
        Arc::new(BlockingWaitStrategy::new())
    } else if normalized == SleepingWaitStrategy::NAME {
        Arc::new(SleepingWaitStrategy::new())
    } else if normalized == DirectPassWaitStrategy::NAME.to_ascii_lowercase() {
        Arc::new(DirectPassWaitStrategy::new())
    } else {
        UnknownQueueWaitStrategy {
            requested: name,
            fallback: BlockingWaitStrategy::NAME,
        }
        .log();
        Arc::new(BlockingWaitStrategy::new())
    }
}
