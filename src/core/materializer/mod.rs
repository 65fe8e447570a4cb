use crate::core::request::JobRequest;
use crate::core::schema::{WorkflowSchema, NONE_MARKER};
use serde_json::Value;

/// Ordered `(flag, value)` pairs handed to every stage of a job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandArgs {
    pairs: Vec<(String, String)>,
}

impl CommandArgs {
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Flatten into argv form: `--flag value --flag value ...`.
    pub fn to_argv(&self) -> Vec<String> {
        self.pairs
            .iter()
            .flat_map(|(flag, value)| [format!("--{}", flag), value.clone()])
            .collect()
    }
}

/// Project a validated request into stage arguments.
///
/// Declared parameters come first in schema order, then uploaded files the schema does not
/// declare, in upload order. Structural keys are never emitted.
pub fn materialize(request: &JobRequest, schema: &WorkflowSchema) -> CommandArgs {
    let mut pairs = Vec::with_capacity(schema.parameters.len());
    for name in schema.parameters.keys() {
        if JobRequest::is_structural(name) {
            continue;
        }
        if let Some(value) = request.get(name) {
            pairs.push((name.clone(), canonical_string(value)));
        }
    }
    for name in request.file_keys() {
        if schema.parameters.contains_key(name) || JobRequest::is_structural(name) {
            continue;
        }
        if let Some(value) = request.get(name) {
            pairs.push((name.to_string(), canonical_string(value)));
        }
    }
    CommandArgs { pairs }
}

/// Render a value the way stage scripts receive it on the command line.
///
/// Booleans and null use the `True`/`False`/`None` spellings stage scripts compare against;
/// whole floats keep a `.0` fraction.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() && float.fract() == 0.0 && float.is_finite() => {
                format!("{:.1}", float)
            }
            _ => number.to_string(),
        },
        Value::Null => NONE_MARKER.to_string(),
        other => other.to_string(),
    }
}
