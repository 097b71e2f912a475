// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default interval between statistics snapshots and collector drains (ms)
pub const DEFAULT_STATS_COLLECTION_INTERVAL_MS: u64 = 1_000;

/// Default interval after which a queue log rolls to a new segment (minutes)
pub const DEFAULT_QUEUE_ROLLING_INTERVAL_MINUTES: u64 = 60;
/// Smallest rolling interval accepted; lower values are raised to it
pub const MIN_QUEUE_ROLLING_INTERVAL_MINUTES: u64 = 1;

/// Queue wait strategy used when none is configured
pub const DEFAULT_QUEUE_WAIT_STRATEGY: &str = "blocking";

pub const WAIT_STRATEGY_NAME_SETTING: &str = "waitStrategy.name";
pub const WAIT_STRATEGY_SETTINGS_PREFIX: &str = "waitStrategy.cfg.";
pub const MAX_MESSAGES_SETTING: &str = "maxMessages";
pub const WAIT_TIME_SETTING: &str = "waitTime";

/// Response wait strategy used when none is configured
pub const DEFAULT_RESPONSE_WAIT_STRATEGY: &str = "messageCount";
pub const DEFAULT_MAX_MESSAGES: u64 = 100;
pub const DEFAULT_WAIT_TIME_MS: u64 = 1_000;

/// Appended to the pipeline id to name its internal statistics queue
pub const STATS_QUEUE_SUFFIX: &str = "-stats";

/// Sleeping wait strategy backoff bounds (ms)
pub const SLEEPING_MIN_BACKOFF_MS: u64 = 1;
pub const SLEEPING_MAX_BACKOFF_MS: u64 = 50;

/// Idle pause for runtimes whose wait strategy returns without a message (ms)
pub const IDLE_MIN_BACKOFF_MS: u64 = 1;
pub const IDLE_MAX_BACKOFF_MS: u64 = 50;

/// Upper bound on how long shutdown waits for a task to finish before aborting it
pub const TASK_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
