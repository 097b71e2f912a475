// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod components;    // built-in sources, operators and emitters
pub mod config;        // configuration, validation, component registry
pub mod engine;        // pipeline assembly, lifecycle and management
pub mod errors;        // error handling
pub mod message;       // the message envelope
pub mod observability;
pub mod queue;         // durable single-producer single-consumer queues
pub mod remote;        // instantiation payloads and client seam
pub mod runtime;       // per-component runtime environments
pub mod strategy;      // queue and response wait strategies
pub mod traits;        // component and wait strategy abstractions
