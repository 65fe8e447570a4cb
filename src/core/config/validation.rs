#![allow(clippy::result_large_err)]

use super::RunnerConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &RunnerConfig) -> Result<(), AppError> {
        if config.workspace.root.as_os_str().is_empty() {
            return Err(invalid("workspace.root cannot be empty"));
        }

        if config.workspace.default_workflow.trim().is_empty() {
            return Err(invalid("workspace.default_workflow cannot be empty"));
        }

        if config.executor.interpreter.trim().is_empty() {
            return Err(invalid("executor.interpreter cannot be empty"));
        }

        if let Some(api_url) = &config.control_plane.api_url {
            let parsed = Url::parse(api_url).map_err(|err| {
                invalid(format!("control_plane.api_url is not a valid URL: {}", err))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(format!(
                    "control_plane.api_url must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }

        if config.control_plane.timeout_seconds == 0 {
            return Err(invalid("control_plane.timeout_seconds must be >= 1"));
        }

        let artifacts = &config.artifacts;
        if let Some(bucket) = &artifacts.bucket {
            if bucket.trim().is_empty() {
                return Err(invalid("artifacts.bucket cannot be empty"));
            }
            if artifacts.store_root.is_some() {
                return Err(invalid(
                    "artifacts.bucket and artifacts.store_root cannot both be set",
                ));
            }
        }

        if let Some(endpoint) = &artifacts.endpoint {
            Url::parse(endpoint).map_err(|err| {
                invalid(format!("artifacts.endpoint is not a valid URL: {}", err))
            })?;
        }

        Ok(())
    }
}

fn invalid<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code("CFG-003")
}
