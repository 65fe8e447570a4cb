#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::request::{kind_of, JobRequest};
use crate::core::schema::{ParameterSpec, ParameterType, WorkflowSchema};
use crate::core::types::ErrorCategory;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Kind of rule a parameter value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    TypeMismatch,
    OutOfRange,
    NotInOptions,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::TypeMismatch => "type-mismatch",
            ViolationKind::OutOfRange => "out-of-range",
            ViolationKind::NotInOptions => "not-in-options",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub parameter: String,
    pub kind: ViolationKind,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.parameter, self.kind, self.detail)
    }
}

/// Every violation found in a request, in schema-declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn has(&self, parameter: &str, kind: ViolationKind) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.parameter == parameter && violation.kind == kind)
    }

    fn push(&mut self, spec: &ParameterSpec, kind: ViolationKind, detail: String) {
        self.violations.push(Violation {
            parameter: spec.name.clone(),
            kind,
            detail,
        });
    }

    /// Treat any violation as fatal, folding the whole report into one error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            return Ok(());
        }
        let mut error = AppError::new(ErrorCategory::ValidationError, self.to_string())
            .with_code("VAL-001");
        for violation in &self.violations {
            error.add_context(&violation.parameter, &violation.kind.to_string());
        }
        Err(error)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("request is valid");
        }
        write!(
            f,
            "invalid job request ({} violation{}):",
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

/// Check a normalized request against the schema without stopping at the first problem.
pub fn validate(request: &JobRequest, schema: &WorkflowSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    for spec in schema.parameters.values() {
        check_parameter(spec, request.get(&spec.name), &mut report);
    }
    tracing::debug!(violations = report.len(), "request validated");
    report
}

fn check_parameter(spec: &ParameterSpec, value: Option<&Value>, report: &mut ValidationReport) {
    let Some(value) = value else {
        report.push(
            spec,
            ViolationKind::TypeMismatch,
            format!("no value supplied and no default declared (expected {})", spec.param_type),
        );
        return;
    };
    if value.is_null() {
        return;
    }

    if !spec.param_type.matches(value) {
        let detail = match value {
            Value::String(text) if spec.param_type == ParameterType::Path => {
                format!("expected an absolute path, got '{}'", text)
            }
            other => format!("expected {}, got {} {}", spec.param_type, kind_of(other), other),
        };
        report.push(spec, ViolationKind::TypeMismatch, detail);
        return;
    }

    if spec.is_range_checked() {
        if let Some(number) = value.as_f64() {
            if let Some(max) = spec.max_value {
                if number > max {
                    report.push(
                        spec,
                        ViolationKind::OutOfRange,
                        format!("{} is greater than max_value {}", number, max),
                    );
                }
            }
            if let Some(min) = spec.min_value {
                if number < min {
                    report.push(
                        spec,
                        ViolationKind::OutOfRange,
                        format!("{} is less than min_value {}", number, min),
                    );
                }
            }
        }
    }

    if spec.is_enum_checked() {
        if let (Some(text), Some(options)) = (value.as_str(), spec.options.as_ref()) {
            if !options.contains(text) {
                let allowed: Vec<&str> = options.iter().map(String::as_str).collect();
                report.push(
                    spec,
                    ViolationKind::NotInOptions,
                    format!("'{}' is not one of [{}]", text, allowed.join(", ")),
                );
            }
        }
    }
}
