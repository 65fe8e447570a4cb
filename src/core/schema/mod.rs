#![allow(clippy::result_large_err)] // Schema APIs return AppError to keep every document problem in one structured error.

use crate::core::config::WorkspaceConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Spelling of an unset optional value in workflow documents and requests.
pub const NONE_MARKER: &str = "None";

/// Whether `value` stands for "no value": JSON null or the `None` marker string.
pub fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text == NONE_MARKER,
        _ => false,
    }
}

/// Declared type of a workflow parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Integer,
    Float,
    String,
    Path,
    Boolean,
}

impl ParameterType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ParameterType::Integer | ParameterType::Float)
    }

    /// Parse textual input into a value of this type.
    ///
    /// Returns `None` when the text is not a valid rendering of the type, so callers can
    /// keep the original value untouched.
    pub fn coerce_str(self, raw: &str) -> Option<Value> {
        match self {
            ParameterType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
            ParameterType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            ParameterType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ParameterType::String | ParameterType::Path => Some(Value::String(raw.to_string())),
        }
    }

    /// Whether `value` is an instance of this type.
    ///
    /// Paths are strings anchored at the filesystem root; floats accept any JSON number.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_number(),
            ParameterType::String => value.is_string(),
            ParameterType::Path => value.as_str().is_some_and(|path| path.starts_with('/')),
            ParameterType::Boolean => value.is_boolean(),
        }
    }

    /// Convert a declared default into this type, or `None` if it cannot represent one.
    fn coerce_default(self, value: &Value) -> Option<Value> {
        if let Value::String(text) = value {
            return self.coerce_str(text);
        }
        match self {
            ParameterType::Integer if value.is_i64() || value.is_u64() => Some(value.clone()),
            ParameterType::Float => value
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number),
            ParameterType::String if value.is_number() || value.is_boolean() => {
                Some(Value::String(value.to_string()))
            }
            ParameterType::Boolean if value.is_boolean() => Some(value.clone()),
            _ => None,
        }
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "int" | "integer" => Ok(ParameterType::Integer),
            "float" => Ok(ParameterType::Float),
            "str" | "string" => Ok(ParameterType::String),
            "path" => Ok(ParameterType::Path),
            "bool" | "boolean" => Ok(ParameterType::Boolean),
            other => Err(format!(
                "unknown type '{}'; supported types are int, float, str, path, bool",
                other
            )),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::String => "string",
            ParameterType::Path => "path",
            ParameterType::Boolean => "boolean",
        };
        f.write_str(label)
    }
}

/// One declared workflow parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParameterType,
    pub default: Option<Value>,
    pub user_defined: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub increment: Option<f64>,
    pub options: Option<IndexSet<String>>,
    pub from_data: bool,
    pub title: Option<String>,
    pub tooltip: Option<String>,
}

impl ParameterSpec {
    /// Build a bare parameter of the given type with no default or constraints.
    pub fn new<T: Into<String>>(name: T, param_type: ParameterType) -> Self {
        ParameterSpec {
            name: name.into(),
            param_type,
            default: None,
            user_defined: false,
            min_value: None,
            max_value: None,
            increment: None,
            options: None,
            from_data: false,
            title: None,
            tooltip: None,
        }
    }

    /// Range checks apply only to numeric parameters exposed to users.
    pub fn is_range_checked(&self) -> bool {
        self.user_defined && self.param_type.is_numeric()
    }

    /// Enumeration checks apply to user-facing strings with a static option list.
    pub fn is_enum_checked(&self) -> bool {
        self.user_defined
            && self.param_type == ParameterType::String
            && !self.from_data
            && self.options.is_some()
    }
}

/// One pipeline step backed by a script under the working root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSpec {
    pub name: String,
    pub script: PathBuf,
}

/// Location of a workflow document, resolved as `root/workflow_dir/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowLocator {
    pub root: PathBuf,
    pub workflow_dir: PathBuf,
    pub name: String,
}

impl WorkflowLocator {
    pub fn new<T: Into<String>>(root: PathBuf, workflow_dir: PathBuf, name: T) -> Self {
        WorkflowLocator {
            root,
            workflow_dir,
            name: name.into(),
        }
    }

    /// Select the requested workflow document, falling back to the configured default.
    pub fn from_config(workspace: &WorkspaceConfig, requested: Option<&str>) -> Self {
        let name = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&workspace.default_workflow);
        WorkflowLocator::new(
            workspace.root.clone(),
            workspace.workflow_dir.clone(),
            name,
        )
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.workflow_dir).join(&self.name)
    }

    fn check_name(&self) -> Result<(), AppError> {
        let mut components = Path::new(&self.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(schema_error(format!(
                "workflow name '{}' must be a plain file name",
                self.name
            ))
            .with_code("SCHEMA-004")),
        }
    }
}

/// Stages and parameters declared by one workflow document; immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSchema {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stages: IndexMap<String, StageSpec>,
    pub parameters: IndexMap<String, ParameterSpec>,
}

impl WorkflowSchema {
    /// Read and validate the workflow document the locator points at.
    pub fn load(locator: &WorkflowLocator) -> Result<Self, AppError> {
        locator.check_name()?;
        let path = locator.path();
        let text = fs::read_to_string(&path).map_err(|err| {
            schema_error(format!(
                "failed to read workflow {}: {}",
                path.display(),
                err
            ))
            .with_code("SCHEMA-001")
        })?;
        let schema = Self::from_yaml_str(&text, &locator.root)
            .map_err(|err| err.with_context("workflow", path.display().to_string()))?;
        tracing::debug!(
            workflow = %path.display(),
            stages = schema.stages.len(),
            parameters = schema.parameters.len(),
            "workflow schema loaded"
        );
        Ok(schema)
    }

    /// Parse a workflow document; stage scripts are resolved against `root`.
    pub fn from_yaml_str(text: &str, root: &Path) -> Result<Self, AppError> {
        let raw: RawWorkflowDocument = serde_yaml::from_str(text).map_err(|err| {
            schema_error(format!("malformed workflow document: {}", err)).with_code("SCHEMA-002")
        })?;

        let mut problems = Vec::new();

        let stages = match raw.stages {
            None => {
                problems.push("document has no 'stages' section".to_string());
                IndexMap::new()
            }
            Some(stages) => build_stages(stages, root, &mut problems),
        };

        let parameters = match raw.parameters {
            None => {
                problems.push("document has no 'parameters' section".to_string());
                IndexMap::new()
            }
            Some(parameters) => parameters
                .into_iter()
                .filter_map(|(name, raw)| build_parameter(name, raw, &mut problems))
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        };

        if !problems.is_empty() {
            return Err(schema_error(format!(
                "invalid workflow schema:\n  - {}",
                problems.join("\n  - ")
            ))
            .with_code("SCHEMA-003"));
        }

        Ok(WorkflowSchema {
            name: raw.name,
            description: raw.description,
            stages,
            parameters,
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.get(name)
    }
}

fn schema_error<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::SchemaError, message)
}

fn build_stages(
    raw: IndexMap<String, RawStage>,
    root: &Path,
    problems: &mut Vec<String>,
) -> IndexMap<String, StageSpec> {
    if raw.is_empty() {
        problems.push("'stages' must declare at least one stage".to_string());
    }
    let mut stages = IndexMap::new();
    for (name, stage) in raw {
        let Some(script) = stage.file.filter(|file| !file.trim().is_empty()) else {
            problems.push(format!("stage '{}' does not name a script file", name));
            continue;
        };
        let script = PathBuf::from(script);
        if !root.join(&script).is_file() {
            problems.push(format!(
                "stage '{}' references missing script {}",
                name,
                root.join(&script).display()
            ));
            continue;
        }
        stages.insert(name.clone(), StageSpec { name, script });
    }
    stages
}

fn build_parameter(
    name: String,
    raw: RawParameter,
    problems: &mut Vec<String>,
) -> Option<ParameterSpec> {
    let before = problems.len();
    let mut report = |message: String| problems.push(format!("parameter '{}': {}", name, message));

    let param_type = match raw.param_type.as_deref().map(ParameterType::from_str) {
        None => {
            report("missing 'type'".to_string());
            return None;
        }
        Some(Err(err)) => {
            report(err);
            return None;
        }
        Some(Ok(param_type)) => param_type,
    };

    let user_defined = flag(raw.user_defined, "user_defined", &mut report);
    let from_data = flag(raw.from_data, "from_data", &mut report);
    let min_value = number(raw.min_value, "min_value", &mut report);
    let max_value = number(raw.max_value, "max_value", &mut report);
    let increment = number(raw.increment, "increment", &mut report);

    let default = raw.default.and_then(|value| {
        if is_unset(&value) {
            return Some(Value::Null);
        }
        match param_type.coerce_default(&value) {
            Some(coerced) => Some(coerced),
            None => {
                report(format!("default {} is not a valid {}", value, param_type));
                None
            }
        }
    });

    let options = raw.options.map(|options| {
        options
            .into_iter()
            .map(|option| match option {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect::<IndexSet<String>>()
    });

    if !param_type.is_numeric() {
        for (present, key) in [
            (min_value.is_some(), "min_value"),
            (max_value.is_some(), "max_value"),
            (increment.is_some(), "increment"),
        ] {
            if present {
                report(format!("'{}' is only allowed on numeric parameters", key));
            }
        }
    }
    if from_data && options.is_some() {
        report("'options' cannot be combined with 'from_data'".to_string());
    }
    if param_type != ParameterType::String {
        if options.is_some() {
            report("'options' is only allowed on string parameters".to_string());
        }
        if from_data {
            report("'from_data' is only allowed on string parameters".to_string());
        }
    }
    if let (Some(min), Some(max)) = (min_value, max_value) {
        if min > max {
            report(format!("min_value {} exceeds max_value {}", min, max));
        }
    }
    if increment.is_some_and(|step| step <= 0.0) {
        report("increment must be positive".to_string());
    }

    if problems.len() != before {
        return None;
    }

    Some(ParameterSpec {
        name,
        param_type,
        default,
        user_defined,
        min_value,
        max_value,
        increment,
        options,
        from_data,
        title: raw.title,
        tooltip: raw.tooltip,
    })
}

fn flag(raw: Option<RawFlag>, key: &str, report: &mut impl FnMut(String)) -> bool {
    match raw {
        None => false,
        Some(RawFlag::Bool(value)) => value,
        Some(RawFlag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                report(format!("'{}' must be true or false, got '{}'", key, text));
                false
            }
        },
    }
}

fn number(raw: Option<RawNumber>, key: &str, report: &mut impl FnMut(String)) -> Option<f64> {
    match raw? {
        RawNumber::Number(value) => Some(value),
        RawNumber::Text(text) => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                report(format!("'{}' must be a number, got '{}'", key, text));
                None
            }
        },
    }
}

#[derive(Debug, Deserialize)]
struct RawWorkflowDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stages: Option<IndexMap<String, RawStage>>,
    #[serde(default)]
    parameters: Option<IndexMap<String, RawParameter>>,
}

#[derive(Debug, Deserialize)]
struct RawStage {
    #[serde(default, alias = "script")]
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    #[serde(default, rename = "type")]
    param_type: Option<String>,
    #[serde(default, deserialize_with = "declared_value")]
    default: Option<Value>,
    #[serde(default)]
    user_defined: Option<RawFlag>,
    #[serde(default)]
    min_value: Option<RawNumber>,
    #[serde(default)]
    max_value: Option<RawNumber>,
    #[serde(default)]
    increment: Option<RawNumber>,
    #[serde(default)]
    options: Option<Vec<Value>>,
    #[serde(default)]
    from_data: Option<RawFlag>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tooltip: Option<String>,
}

/// Keeps an explicit `default: null` distinct from an omitted default.
fn declared_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}
