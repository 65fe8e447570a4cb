#![allow(clippy::result_large_err)]

//! Fills defaults, coerces textual input and prepares output directories for a job request.
//!
//! Normalization is best-effort: data-shape problems are left in place for the validator to
//! report. The only failure is a directory that cannot be created.

use crate::core::error::AppError;
use crate::core::request::JobRequest;
use crate::core::schema::{is_unset, ParameterType, WorkflowSchema};
use crate::core::types::ErrorCategory;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Normalize `request` in place against `schema` and return it.
///
/// Callers that need the raw submission must clone it first. Running this twice over its
/// own output yields the same request.
pub fn normalize<'a>(
    request: &'a mut JobRequest,
    schema: &WorkflowSchema,
    job_id: &str,
) -> Result<&'a mut JobRequest, AppError> {
    let merged = request.merge_input_files();
    request.set_job_id(job_id);

    let mut defaulted = 0usize;
    let mut coerced = 0usize;
    for (name, spec) in &schema.parameters {
        if !request.contains(name) {
            match &spec.default {
                Some(default) => {
                    request.insert(name.clone(), default.clone());
                    defaulted += 1;
                }
                None => {
                    tracing::debug!(parameter = %name, "no value and no default; left for validation");
                    continue;
                }
            }
        }

        if request.get(name).is_some_and(|value| value.is_string() && is_unset(value)) {
            request.insert(name.clone(), Value::Null);
            continue;
        }

        if let Some(Value::String(raw)) = request.get(name).cloned() {
            if spec.param_type.is_numeric() || spec.param_type == ParameterType::Boolean {
                match spec.param_type.coerce_str(&raw) {
                    Some(value) => {
                        request.insert(name.clone(), value);
                        coerced += 1;
                    }
                    None => tracing::debug!(
                        parameter = %name,
                        value = %raw,
                        expected = %spec.param_type,
                        "value does not parse; left unchanged"
                    ),
                }
            }
        }

        if spec.param_type == ParameterType::Path {
            if let Some(Value::String(raw)) = request.get(name) {
                ensure_directory(name, raw)?;
            }
        }
    }

    tracing::debug!(
        job_id,
        merged_files = merged,
        defaulted,
        coerced,
        "request normalized"
    );
    Ok(request)
}

/// Create the directory named by a trailing-slash path value, one level only.
///
/// Relative values are skipped; the validator rejects them.
fn ensure_directory(parameter: &str, raw: &str) -> Result<bool, AppError> {
    let path = Path::new(raw);
    if !raw.ends_with('/') || !path.is_absolute() {
        return Ok(false);
    }
    match fs::create_dir(path) {
        Ok(()) => {
            tracing::info!(parameter, path = %path.display(), "created directory");
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(err) => Err(AppError::new(
            ErrorCategory::DirectoryCreationError,
            format!("failed to create directory {}: {}", path.display(), err),
        )
        .with_code("NORM-001")
        .with_context("parameter", parameter)),
    }
}
