// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wait strategy implementations.
//!
//! * `queue` - how a consumer waits on an empty queue
//! * `response` - when a delayed-response operator has to flush its result

pub mod queue;
pub mod response;
