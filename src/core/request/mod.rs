#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

pub const JOB_ID_KEY: &str = "job_id";
pub const INPUT_FILES_KEY: &str = "input_files";
pub const WORKFLOW_NAME_KEY: &str = "workflow_name";
const WORKFLOW_NAME_ALIAS: &str = "workflow";

/// Parameter values submitted for one job, keyed by parameter name.
///
/// Besides parameters the request carries a few structural keys (`job_id`, `input_files`,
/// `workflow_name`) that are never handed to stages as flags. Entries copied out of
/// `input_files` are remembered so they can be materialized even when the workflow does not
/// declare them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobRequest {
    values: IndexMap<String, Value>,
    file_keys: IndexSet<String>,
}

impl JobRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(map) => Ok(JobRequest {
                values: map.into_iter().collect(),
                file_keys: IndexSet::new(),
            }),
            other => Err(AppError::new(
                ErrorCategory::SerializationError,
                format!("job request must be a JSON object, got {}", kind_of(&other)),
            )
            .with_code("REQ-001")),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn is_structural(key: &str) -> bool {
        matches!(
            key,
            JOB_ID_KEY | INPUT_FILES_KEY | WORKFLOW_NAME_KEY | WORKFLOW_NAME_ALIAS
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Presence check; a key holding `0`, `""`, `false` or `null` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.values.get(JOB_ID_KEY).and_then(Value::as_str)
    }

    pub fn set_job_id<T: Into<String>>(&mut self, job_id: T) {
        self.values
            .insert(JOB_ID_KEY.to_string(), Value::String(job_id.into()));
    }

    /// Workflow document requested by the caller, if any.
    pub fn workflow_name(&self) -> Option<&str> {
        self.values
            .get(WORKFLOW_NAME_KEY)
            .or_else(|| self.values.get(WORKFLOW_NAME_ALIAS))
            .and_then(Value::as_str)
    }

    pub fn input_files(&self) -> Option<&Map<String, Value>> {
        self.values.get(INPUT_FILES_KEY).and_then(Value::as_object)
    }

    /// Keys copied into the top level from `input_files`, in upload order.
    pub fn file_keys(&self) -> impl Iterator<Item = &str> {
        self.file_keys.iter().map(String::as_str)
    }

    /// Copy every `input_files` entry into the top level; returns how many were merged.
    pub fn merge_input_files(&mut self) -> usize {
        let Some(files) = self.input_files().cloned() else {
            if let Some(other) = self.values.get(INPUT_FILES_KEY) {
                if !other.is_null() {
                    tracing::warn!(
                        "ignoring input_files: expected an object, got {}",
                        kind_of(other)
                    );
                }
            }
            return 0;
        };
        let merged = files.len();
        for (key, value) in files {
            self.file_keys.insert(key.clone());
            self.values.insert(key, value);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
