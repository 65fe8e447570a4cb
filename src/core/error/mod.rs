use crate::core::types::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub context: IndexMap<String, String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        let severity = match category {
            ErrorCategory::SchemaError
            | ErrorCategory::ValidationError
            | ErrorCategory::DirectoryCreationError
            | ErrorCategory::StageExecutionError
            | ErrorCategory::ControlPlaneError
            | ErrorCategory::SerializationError
            | ErrorCategory::IoError
            | ErrorCategory::InternalError => ErrorSeverity::Error,
            ErrorCategory::ArtifactError => ErrorSeverity::Warning,
        };
        AppError {
            category,
            severity,
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            context: IndexMap::new(),
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_source<T: Into<String>>(
        category: ErrorCategory,
        message: T,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        let mut error = AppError::new(category, message);
        error.source = Some(anyhow::anyhow!(source));
        error
    }

    pub fn with_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        for (index, (key, value)) in self.context.iter().enumerate() {
            let lead = if index == 0 { " (" } else { ", " };
            write!(f, "{}{}={}", lead, key, value)?;
        }
        if !self.context.is_empty() {
            f.write_str(")")?;
        }
        match &self.source {
            Some(source) => write!(f, "\nCaused by: {:#}", source),
            None => Ok(()),
        }
    }
}

impl std::error::Error for AppError {}

/// Wrap a foreign error, keeping it as the source.
fn wrap_foreign(category: ErrorCategory, code: &str, source: anyhow::Error) -> AppError {
    let mut error = AppError::new(category, source.to_string()).with_code(code);
    error.source = Some(source);
    error
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        wrap_foreign(ErrorCategory::InternalError, "ANYHOW_ERROR", e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        wrap_foreign(ErrorCategory::IoError, "IO_ERROR", e.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        wrap_foreign(ErrorCategory::SerializationError, "JSON_ERROR", e.into())
    }
}

pub trait ErrorReporter {
    fn report_error(&self, error: &AppError);
    fn report_warning(&self, message: &str, context: Option<String>);
}

/// Routes errors through the tracing subscriber so they land in the job log.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorReporter;

impl ErrorReporter for DefaultErrorReporter {
    fn report_error(&self, error: &AppError) {
        tracing::error!(code = %error.code, category = %error.category, "{}", error.message);
        for (key, value) in &error.context {
            tracing::error!(code = %error.code, "  {}: {}", key, value);
        }
        if let Some(ref source) = error.source {
            tracing::error!(code = %error.code, "  caused by: {:#}", source);
        }
    }

    fn report_warning(&self, message: &str, context: Option<String>) {
        match context {
            Some(ctx) => tracing::warn!(context = %ctx, "{}", message),
            None => tracing::warn!("{}", message),
        }
    }
}
