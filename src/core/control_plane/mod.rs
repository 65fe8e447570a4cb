#![allow(clippy::result_large_err)]

//! Client for the job-state API that hands out job configs and records job status.

use crate::core::config::ControlPlaneConfig;
use crate::core::error::AppError;
use crate::core::request::JobRequest;
use crate::core::types::{ErrorCategory, JobStatus};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Parameter values submitted for the job.
    async fn fetch_job_config(&self, job_id: &str) -> Result<JobRequest, AppError>;

    /// Object-store folder that receives the job's results.
    async fn job_folder(&self, job_id: &str) -> Result<String, AppError>;

    async fn set_running(&self, job_id: &str) -> Result<(), AppError>;

    /// `result_files` is the payload manifest as written by the stages.
    async fn set_completed(&self, job_id: &str, result_files: Value) -> Result<(), AppError>;

    async fn set_failed(&self, job_id: &str, message: &str) -> Result<(), AppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("Control plane not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Missing field '{field}' in response from {endpoint}")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ControlPlaneError {
    fn code(&self) -> &'static str {
        match self {
            ControlPlaneError::NotConfigured(_) | ControlPlaneError::InvalidUrl(_) => "CP-001",
            ControlPlaneError::Network(_) => "CP-002",
            ControlPlaneError::Status { .. } => "CP-003",
            ControlPlaneError::MissingField { .. } | ControlPlaneError::Deserialization(_) => {
                "CP-004"
            }
        }
    }
}

impl From<ControlPlaneError> for AppError {
    fn from(err: ControlPlaneError) -> Self {
        AppError::new(ErrorCategory::ControlPlaneError, err.to_string()).with_code(err.code())
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// `ControlPlane` over the REST API. The bearer token is fetched on first use and reused.
pub struct HttpControlPlane {
    client: reqwest::Client,
    api_url: Url,
    credentials: Credentials,
    config_version: Option<String>,
    token: OnceCell<String>,
}

impl HttpControlPlane {
    pub fn new(
        api_url: Url,
        credentials: Credentials,
        config_version: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ControlPlaneError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_url,
            credentials,
            config_version,
            token: OnceCell::new(),
        })
    }

    pub fn from_config(config: &ControlPlaneConfig) -> Result<Self, ControlPlaneError> {
        let api_url = config
            .api_url
            .as_deref()
            .ok_or(ControlPlaneError::NotConfigured("api_url"))?;
        let api_url =
            Url::parse(api_url).map_err(|e| ControlPlaneError::InvalidUrl(e.to_string()))?;
        let credentials = Credentials {
            user: config
                .user
                .clone()
                .ok_or(ControlPlaneError::NotConfigured("user"))?,
            password: config
                .password
                .clone()
                .ok_or(ControlPlaneError::NotConfigured("password"))?,
        };
        Self::new(
            api_url,
            credentials,
            config.config_version.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.as_str().trim_end_matches('/'), path)
    }

    fn job_endpoint(&self, job_id: &str, action: &str) -> String {
        self.endpoint(&format!("/api/jobs/{}/{}", job_id, action))
    }

    async fn token(&self) -> Result<&str, ControlPlaneError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let endpoint = self.endpoint("/login");
                let payload = json!({
                    "email": self.credentials.user,
                    "password": self.credentials.password,
                });
                let response = self
                    .client
                    .post(&endpoint)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| ControlPlaneError::Network(e.to_string()))?;
                let response = check_status(&endpoint, response).await?;
                let login: LoginResponse = response
                    .json()
                    .await
                    .map_err(|e| ControlPlaneError::Deserialization(e.to_string()))?;
                tracing::debug!("obtained control plane token");
                Ok::<_, ControlPlaneError>(login.access_token)
            })
            .await?;
        Ok(token.as_str())
    }

    async fn get_field(&self, endpoint: String, field: &'static str) -> Result<Value, ControlPlaneError> {
        let token = self.token().await?;
        let response = self
            .client
            .get(&endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;
        let response = check_status(&endpoint, response).await?;
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| ControlPlaneError::Deserialization(e.to_string()))?;
        body.get_mut(field)
            .map(Value::take)
            .ok_or(ControlPlaneError::MissingField { endpoint, field })
    }

    async fn put_status(
        &self,
        job_id: &str,
        status: JobStatus,
        body: Option<Value>,
    ) -> Result<(), ControlPlaneError> {
        let token = self.token().await?;
        let endpoint = self.job_endpoint(job_id, &status.to_string());
        let mut request = self.client.put(&endpoint).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;
        check_status(&endpoint, response).await?;
        tracing::info!(job_id, %status, "job status updated");
        Ok(())
    }
}

async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ControlPlaneError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ControlPlaneError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn fetch_job_config(&self, job_id: &str) -> Result<JobRequest, AppError> {
        let mut endpoint = self.job_endpoint(job_id, "config");
        if let Some(version) = &self.config_version {
            endpoint.push_str(&format!("?version={}", version));
        }
        let config = self
            .get_field(endpoint, "config")
            .await
            .map_err(|e| AppError::from(e).with_context("job_id", job_id))?;
        JobRequest::from_value(config).map_err(|e| e.with_context("job_id", job_id))
    }

    async fn job_folder(&self, job_id: &str) -> Result<String, AppError> {
        let endpoint = self.job_endpoint(job_id, "folder");
        let folder = self
            .get_field(endpoint.clone(), "folder")
            .await
            .map_err(|e| AppError::from(e).with_context("job_id", job_id))?;
        match folder {
            Value::String(folder) => Ok(folder),
            _ => Err(AppError::from(ControlPlaneError::MissingField {
                endpoint,
                field: "folder",
            })
            .with_context("job_id", job_id)),
        }
    }

    async fn set_running(&self, job_id: &str) -> Result<(), AppError> {
        Ok(self.put_status(job_id, JobStatus::Running, None).await?)
    }

    async fn set_completed(&self, job_id: &str, result_files: Value) -> Result<(), AppError> {
        let body = json!({ "result_files": { "files": result_files } });
        Ok(self
            .put_status(job_id, JobStatus::Completed, Some(body))
            .await?)
    }

    async fn set_failed(&self, job_id: &str, message: &str) -> Result<(), AppError> {
        let body = json!({ "error_message": message });
        Ok(self.put_status(job_id, JobStatus::Failed, Some(body)).await?)
    }
}
