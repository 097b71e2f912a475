// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_QUEUE_ROLLING_INTERVAL_MINUTES, DEFAULT_QUEUE_WAIT_STRATEGY,
    DEFAULT_STATS_COLLECTION_INTERVAL_MS, MIN_QUEUE_ROLLING_INTERVAL_MINUTES,
};
use crate::errors::{ConfigurationError, PipelineError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Complete description of one micro pipeline.
///
/// A pipeline is a set of named queues plus the components wired between them.
/// It is typically loaded from a YAML file, though JSON and TOML are accepted too.
///
/// # Fields
/// * `id` - Cluster-unique pipeline identifier
/// * `queues` - Queue definitions, referenced by id from components
/// * `components` - Sources, operators and emitters making up the pipeline
/// * `stats_collection_timer` - Statistics interval in ms (optional, defaults to 1000)
///
/// # Example
/// ```yaml
/// id: price-aggregation
/// statsCollectionTimer: 500
/// queues:
///   - id: raw
///   - id: aggregated
///     waitStrategy: sleeping
/// components:
///   - id: reader
///     type: SOURCE
///     name: fileLineSource
///     version: 0.0.1
///     toQueue: raw
///     settings:
///       file: /var/data/prices.jsonl
///   - id: aggregator
///     type: DELAYED_RESPONSE_OPERATOR
///     name: jsonContentAggregator
///     version: 0.0.1
///     fromQueue: raw
///     toQueue: aggregated
///   - id: printer
///     type: EMITTER
///     name: logEmitter
///     version: 0.0.1
///     fromQueue: aggregated
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroPipelineConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub queues: Vec<StreamingMessageQueueConfiguration>,
    #[serde(default)]
    pub components: Vec<ComponentConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_collection_timer: Option<u64>,
}

impl MicroPipelineConfiguration {
    /// Statistics interval, using the built-in default if not configured.
    pub fn get_stats_collection_interval(&self) -> Duration {
        Duration::from_millis(
            self.stats_collection_timer
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_STATS_COLLECTION_INTERVAL_MS),
        )
    }
}

/// Configuration of a single streaming message queue.
///
/// # Fields
/// * `id` - Pipeline-unique queue identifier
/// * `wait_strategy` - `blocking`, `sleeping` or `directPass` (optional, defaults to `blocking`)
/// * `durability` - Where and how the queue's log is stored
///
/// # Example
/// ```yaml
/// id: raw
/// waitStrategy: blocking
/// durability:
///   basePath: /var/spqr/queues
///   rollingIntervalMinutes: 15
///   deleteOnShutdown: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingMessageQueueConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_strategy: Option<String>,
    #[serde(default)]
    pub durability: QueueDurability,
}

impl StreamingMessageQueueConfiguration {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_wait_strategy(mut self, name: impl Into<String>) -> Self {
        self.wait_strategy = Some(name.into());
        self
    }

    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.durability.base_path = Some(path.into());
        self
    }

    pub fn with_delete_on_shutdown(mut self, delete: bool) -> Self {
        self.durability.delete_on_shutdown = Some(delete);
        self
    }

    /// Wait strategy name, using the built-in default if not configured.
    pub fn get_wait_strategy(&self) -> &str {
        self.wait_strategy
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_QUEUE_WAIT_STRATEGY)
    }
}

/// Storage options of a queue's durable log. All values are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDurability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_interval_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_on_shutdown: Option<bool>,
}

impl QueueDurability {
    /// Base directory for queue logs, defaulting to the system temp dir.
    pub fn get_base_path(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Segment rolling interval, never shorter than one minute.
    pub fn get_rolling_interval(&self) -> Duration {
        let minutes = self
            .rolling_interval_minutes
            .unwrap_or(DEFAULT_QUEUE_ROLLING_INTERVAL_MINUTES)
            .max(MIN_QUEUE_ROLLING_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    pub fn get_delete_on_shutdown(&self) -> bool {
        self.delete_on_shutdown.unwrap_or(true)
    }
}

/// Kind of a pipeline component, which decides the runtime environment it runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Source,
    DirectResponseOperator,
    DelayedResponseOperator,
    Sink,
    Emitter,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Source => "SOURCE",
            ComponentType::DirectResponseOperator => "DIRECT_RESPONSE_OPERATOR",
            ComponentType::DelayedResponseOperator => "DELAYED_RESPONSE_OPERATOR",
            ComponentType::Sink => "SINK",
            ComponentType::Emitter => "EMITTER",
        }
    }

    pub fn requires_from_queue(&self) -> bool {
        !matches!(self, ComponentType::Source)
    }

    pub fn requires_to_queue(&self) -> bool {
        matches!(
            self,
            ComponentType::Source
                | ComponentType::DirectResponseOperator
                | ComponentType::DelayedResponseOperator
        )
    }

    /// Sinks and emitters run in the same runtime and are interchangeable.
    pub fn is_compatible_with(&self, other: ComponentType) -> bool {
        let terminal = |t: ComponentType| matches!(t, ComponentType::Sink | ComponentType::Emitter);
        *self == other || (terminal(*self) && terminal(other))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOURCE" => Ok(ComponentType::Source),
            "DIRECT_RESPONSE_OPERATOR" => Ok(ComponentType::DirectResponseOperator),
            "DELAYED_RESPONSE_OPERATOR" => Ok(ComponentType::DelayedResponseOperator),
            "SINK" => Ok(ComponentType::Sink),
            "EMITTER" => Ok(ComponentType::Emitter),
            other => Err(format!("unknown component type '{}'", other)),
        }
    }
}

/// Configuration for a single pipeline component.
///
/// The `type` is kept as written so that validation can tell a missing type
/// from an unknown one; use [`ComponentConfiguration::kind`] for the parsed value.
///
/// # Fields
/// * `id` - Pipeline-unique component identifier
/// * `component_type` - One of the [`ComponentType`] names
/// * `name` / `version` - Registry key of the implementation
/// * `settings` - Implementation-specific settings
/// * `from_queue` - Queue the component reads from (operators, sinks, emitters)
/// * `to_queue` - Queue the component writes to (sources, operators)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfiguration {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub settings: ComponentSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_queue: Option<String>,
}

impl ComponentConfiguration {
    pub fn new(
        id: impl Into<String>,
        component_type: ComponentType,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            component_type: Some(component_type.as_str().to_string()),
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn from_queue(mut self, queue_id: impl Into<String>) -> Self {
        self.from_queue = Some(queue_id.into());
        self
    }

    pub fn to_queue(mut self, queue_id: impl Into<String>) -> Self {
        self.to_queue = Some(queue_id.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Parsed component type; `None` when absent or not a known type.
    pub fn kind(&self) -> Option<ComponentType> {
        self.component_type
            .as_deref()
            .and_then(|raw| ComponentType::from_str(raw).ok())
    }
}

/// Implementation-specific settings of a component.
///
/// Keys are flat strings; nested strategy options use dotted keys such as
/// `waitStrategy.cfg.maxMessages`. Values keep whatever type the document gave
/// them, and the typed getters accept numbers and booleans written as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentSettings(HashMap<String, serde_yaml::Value>);

impl ComponentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            serde_yaml::Value::Bool(b) => Some(*b),
            serde_yaml::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            serde_yaml::Value::Number(n) => n.as_u64(),
            serde_yaml::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Deserialize a structured setting. `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_yaml::Error> {
        self.0
            .get(key)
            .map(|value| serde_yaml::from_value(value.clone()))
            .transpose()
    }

    /// All settings whose key starts with `prefix`, with the prefix stripped.
    pub fn with_prefix(&self, prefix: &str) -> ComponentSettings {
        ComponentSettings(
            self.0
                .iter()
                .filter_map(|(key, value)| {
                    key.strip_prefix(prefix)
                        .filter(|rest| !rest.is_empty())
                        .map(|rest| (rest.to_string(), value.clone()))
                })
                .collect(),
        )
    }
}

/// Document format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension, YAML when unknown.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => ConfigFormat::Json,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Parse a pipeline configuration document
pub fn parse_config(
    content: &str,
    format: ConfigFormat,
) -> Result<MicroPipelineConfiguration, ConfigurationError> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
        }
    }
}

/// Load a pipeline configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MicroPipelineConfiguration, ConfigurationError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Load and validate a pipeline configuration from a file
///
/// Validation stops at the first structural problem found; see
/// [`crate::config::validate_pipeline`].
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
) -> Result<MicroPipelineConfiguration, PipelineError> {
    let cfg = load_config(path)?;
    crate::config::validate_pipeline(&cfg)?;
    Ok(cfg)
}
