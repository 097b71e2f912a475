// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Delayed-response operator aggregating values extracted from JSON documents.
//!
//! # Settings
//! * `pipelineId` - copied into every result document (optional)
//! * `documentType` - copied into every result document (optional)
//! * `forwardRawData` - keep the extracted values of each message (default `true`)
//! * `fields` - list of `{name, path, type}`; `path` is dot separated, `type`
//!   is `NUMERICAL` (default) or `STRING`. The flat form `field.1.name`,
//!   `field.1.path`, `field.1.type`, `field.2.name`, ... is accepted as well.
//!
//! Numerical fields are read as 64-bit integers and aggregated into
//! `sum`/`min`/`max`/`count`; string fields count occurrences per value.
//!
//! # Example result
//! ```json
//! {"pipelineId":"prices","documentType":"summary",
//!  "aggregatedValues":{"price":{"sum":35,"min":5,"max":20,"count":3}}}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ComponentSettings;
use crate::errors::{ConfigurationError, ProcessingError};
use crate::message::StreamingDataMessage;
use crate::traits::DelayedResponseOperator;

pub const PIPELINE_ID_SETTING: &str = "pipelineId";
pub const DOCUMENT_TYPE_SETTING: &str = "documentType";
pub const FORWARD_RAW_DATA_SETTING: &str = "forwardRawData";
pub const FIELDS_SETTING: &str = "fields";
const FLAT_FIELD_PREFIX: &str = "field.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValueType {
    Numerical,
    String,
}

impl FieldValueType {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(t) if t.trim().eq_ignore_ascii_case("STRING") => FieldValueType::String,
            _ => FieldValueType::Numerical,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FieldSettingDocument {
    name: String,
    path: String,
    #[serde(rename = "type", default)]
    value_type: Option<String>,
}

/// A field to extract: output name, path into the document and how to aggregate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSetting {
    pub name: String,
    pub path: Vec<String>,
    pub value_type: FieldValueType,
}

impl FieldSetting {
    pub fn new(name: &str, path: &str, value_type: FieldValueType) -> Self {
        Self {
            name: name.trim().to_string(),
            path: path.split('.').map(|s| s.to_string()).collect(),
            value_type,
        }
    }

    fn extract<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.path
            .iter()
            .try_fold(document, |node, step| node.get(step.as_str()))
            .filter(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumericalAggregate {
    pub sum: i64,
    pub min: i64,
    pub max: i64,
    pub count: u64,
}

impl NumericalAggregate {
    fn new(value: i64) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
            count: 1,
        }
    }

    fn add(&mut self, value: i64) {
        self.sum = self.sum.saturating_add(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldAggregate {
    Numerical(NumericalAggregate),
    Occurrences(BTreeMap<String, u64>),
}

/// One aggregation window, serialised as the operator's result document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    pub aggregated_values: BTreeMap<String, FieldAggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<BTreeMap<String, Value>>>,
}

impl AggregationResult {
    fn empty(pipeline_id: &Option<String>, document_type: &Option<String>, forward_raw_data: bool) -> Self {
        Self {
            pipeline_id: pipeline_id.clone(),
            document_type: document_type.clone(),
            aggregated_values: BTreeMap::new(),
            raw_data: forward_raw_data.then(Vec::new),
        }
    }

    fn add_numerical(&mut self, field: &str, value: i64) {
        match self.aggregated_values.get_mut(field) {
            Some(FieldAggregate::Numerical(aggregate)) => aggregate.add(value),
            _ => {
                self.aggregated_values
                    .insert(field.to_string(), FieldAggregate::Numerical(NumericalAggregate::new(value)));
            }
        }
    }

    fn add_occurrence(&mut self, field: &str, value: String) {
        let entry = self
            .aggregated_values
            .entry(field.to_string())
            .or_insert_with(|| FieldAggregate::Occurrences(BTreeMap::new()));
        if let FieldAggregate::Occurrences(counts) = entry {
            *counts.entry(value).or_insert(0) += 1;
        }
    }
}

fn numerical_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
pub struct JsonContentAggregator {
    id: String,
    pipeline_id: Option<String>,
    document_type: Option<String>,
    forward_raw_data: bool,
    fields: Vec<FieldSetting>,
    result: AggregationResult,
    documents_in_window: u64,
    messages_since_last_result: u64,
    total_messages: u64,
}

impl Default for JsonContentAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonContentAggregator {
    pub const NAME: &'static str = "jsonContentAggregator";
    pub const VERSION: &'static str = "0.0.1";

    pub fn new() -> Self {
        Self {
            id: String::new(),
            pipeline_id: None,
            document_type: None,
            forward_raw_data: true,
            fields: Vec::new(),
            result: AggregationResult::empty(&None, &None, true),
            documents_in_window: 0,
            messages_since_last_result: 0,
            total_messages: 0,
        }
    }

    pub fn fields(&self) -> &[FieldSetting] {
        &self.fields
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages
    }

    fn read_fields(&self, settings: &ComponentSettings) -> Result<Vec<FieldSetting>, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidSetting {
            component_id: self.id.clone(),
            setting: FIELDS_SETTING.to_string(),
            reason,
        };

        let listed: Option<Vec<FieldSettingDocument>> =
            settings.get_as(FIELDS_SETTING).map_err(|e| invalid(e.to_string()))?;
        if let Some(listed) = listed {
            return listed
                .into_iter()
                .map(|doc| {
                    if doc.name.trim().is_empty() || doc.path.trim().is_empty() {
                        return Err(invalid("every field needs a name and a path".to_string()));
                    }
                    Ok(FieldSetting::new(
                        &doc.name,
                        doc.path.trim(),
                        FieldValueType::parse(doc.value_type.as_deref()),
                    ))
                })
                .collect();
        }

        let mut fields = Vec::new();
        for index in 1.. {
            let Some(name) = settings
                .get_str(&format!("{}{}.name", FLAT_FIELD_PREFIX, index))
                .filter(|n| !n.trim().is_empty())
            else {
                break;
            };
            let path_key = format!("{}{}.path", FLAT_FIELD_PREFIX, index);
            let path = settings
                .get_str(&path_key)
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| ConfigurationError::MissingSetting {
                    component_id: self.id.clone(),
                    setting: path_key.clone(),
                })?;
            let value_type = settings.get_str(&format!("{}{}.type", FLAT_FIELD_PREFIX, index));
            fields.push(FieldSetting::new(name, path.trim(), FieldValueType::parse(value_type)));
        }
        Ok(fields)
    }

    fn fresh_result(&self) -> AggregationResult {
        AggregationResult::empty(&self.pipeline_id, &self.document_type, self.forward_raw_data)
    }

    fn aggregate(&mut self, document: &Value) {
        let mut raw = BTreeMap::new();
        for field in &self.fields {
            let Some(value) = field.extract(document) else {
                continue;
            };
            match field.value_type {
                FieldValueType::Numerical => {
                    let Some(number) = numerical_value(value) else {
                        continue;
                    };
                    self.result.add_numerical(&field.name, number);
                    raw.insert(field.name.clone(), Value::from(number));
                }
                FieldValueType::String => {
                    let text = text_value(value);
                    raw.insert(field.name.clone(), Value::from(text.clone()));
                    self.result.add_occurrence(&field.name, text);
                }
            }
        }
        if let Some(raw_data) = self.result.raw_data.as_mut() {
            raw_data.push(raw);
        }
        self.documents_in_window += 1;
    }
}

#[async_trait]
impl DelayedResponseOperator for JsonContentAggregator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, id: &str, settings: &ComponentSettings) -> Result<(), ConfigurationError> {
        if id.trim().is_empty() {
            return Err(ConfigurationError::MissingComponentId);
        }
        self.id = id.trim().to_string();

        let text = |key: &str| {
            settings
                .get_str(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        self.pipeline_id = text(PIPELINE_ID_SETTING);
        self.document_type = text(DOCUMENT_TYPE_SETTING);
        self.forward_raw_data = match settings.get(FORWARD_RAW_DATA_SETTING) {
            None => true,
            Some(_) => settings.get_bool(FORWARD_RAW_DATA_SETTING).ok_or_else(|| {
                ConfigurationError::InvalidSetting {
                    component_id: self.id.clone(),
                    setting: FORWARD_RAW_DATA_SETTING.to_string(),
                    reason: "expected true or false".to_string(),
                }
            })?,
        };
        self.fields = self.read_fields(settings)?;
        self.result = self.fresh_result();

        tracing::debug!(
            component_id = %self.id,
            fields = self.fields.len(),
            forward_raw_data = self.forward_raw_data,
            "json content aggregator initialized"
        );
        Ok(())
    }

    async fn on_message(&mut self, message: StreamingDataMessage) -> Result<(), ProcessingError> {
        self.total_messages += 1;
        self.messages_since_last_result += 1;

        if message.is_empty() {
            return Ok(());
        }
        let document: Value = serde_json::from_slice(message.body())
            .map_err(|e| ProcessingError::MalformedBody(e.to_string()))?;
        self.aggregate(&document);
        Ok(())
    }

    fn get_result(&mut self) -> Result<Vec<StreamingDataMessage>, ProcessingError> {
        let fresh = self.fresh_result();
        let result = std::mem::replace(&mut self.result, fresh);
        let documents = std::mem::take(&mut self.documents_in_window);
        self.messages_since_last_result = 0;

        if documents == 0 {
            return Ok(Vec::new());
        }
        let body = serde_json::to_vec(&result).map_err(|e| ProcessingError::Encoding(e.to_string()))?;
        Ok(vec![StreamingDataMessage::now(body)])
    }

    fn messages_since_last_result(&self) -> u64 {
        self.messages_since_last_result
    }
}
