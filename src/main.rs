// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use spqr_pipeline::config::{load_and_validate_config, ComponentRegistry};
use spqr_pipeline::engine::MicroPipelineManager;

const NODE_ID_VARIABLE: &str = "SPQR_NODE_ID";
const DEFAULT_NODE_ID: &str = "local";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <pipeline-config-file>", args[0]);
        eprintln!("Example: {} configs/prices.yaml", args[0]);
        bail!("expected exactly one pipeline configuration file");
    }
    let config_file = &args[1];

    let config = load_and_validate_config(config_file)
        .with_context(|| format!("invalid pipeline configuration '{}'", config_file))?;

    let node_id = env::var(NODE_ID_VARIABLE).unwrap_or_else(|_| DEFAULT_NODE_ID.to_string());
    let registry = Arc::new(ComponentRegistry::with_builtin_components());
    let manager = MicroPipelineManager::new(node_id, registry);

    let pipeline_id = manager
        .execute_pipeline(&config)
        .await
        .with_context(|| format!("failed to start pipeline '{}'", config.id))?;
    tracing::info!(pipeline_id = %pipeline_id, "pipeline running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!(pipeline_id = %pipeline_id, "shutting down");
    manager.shutdown().await;
    Ok(())
}
