// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod component;
pub mod wait_strategy;

pub use component::{Component, DelayedResponseOperator, DirectResponseOperator, Emitter, Source};
pub use wait_strategy::{
    delayed_response_channel, DelayedResponseCollector, DelayedResponseNotifier,
    DelayedResponseWaitStrategy, QueueWaitStrategy,
};
