#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

/// One result file as listed in the payload manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload manifest written by the stages.
///
/// `images`, `figures` and `tables` are lists of carousels; `download` is a flat list.
/// Unknown keys are preserved so the manifest can be reported back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Vec<ResultFile>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figures: Option<Vec<Vec<ResultFile>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Vec<ResultFile>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Vec<ResultFile>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultManifest {
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::ArtifactError,
                format!("malformed result manifest: {}", err),
            )
            .with_code("ART-002")
        })
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::ArtifactError,
                format!("failed to read result manifest {}: {}", path.display(), err),
            )
            .with_code("ART-001")
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_context("manifest", path.display().to_string()))
    }

    /// Every file referenced by the manifest: images, figures, tables, then downloads.
    pub fn files(&self) -> Vec<&str> {
        let carousels = [&self.images, &self.figures, &self.tables];
        let mut files: Vec<&str> = carousels
            .into_iter()
            .flatten()
            .flatten()
            .flatten()
            .map(|entry| entry.file.as_str())
            .collect();
        files.extend(self.download.iter().flatten().map(|entry| entry.file.as_str()));
        files
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Read the upload manifest, a JSON list of extra file paths. A missing file means no extras.
pub fn load_upload_manifest(path: &Path) -> Result<Vec<String>, AppError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(manifest = %path.display(), "upload manifest not found; no extra artifacts");
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(AppError::new(
                ErrorCategory::ArtifactError,
                format!("failed to read upload manifest {}: {}", path.display(), err),
            )
            .with_code("ART-001"))
        }
    };
    serde_json::from_str(&text).map_err(|err| {
        AppError::new(
            ErrorCategory::ArtifactError,
            format!("upload manifest must be a list of paths: {}", err),
        )
        .with_code("ART-002")
        .with_context("manifest", path.display().to_string())
    })
}

/// Object key for a source file: the job folder followed by the path as written, `//` collapsed.
pub fn object_key(folder: &str, source: &str) -> String {
    let mut key = format!("{}{}", folder, source);
    while key.contains("//") {
        key = key.replace("//", "/");
    }
    key
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, source: &Path) -> Result<(), AppError>;
}

/// Object-store mirror rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Location a key maps to under the store root; keys may not climb out of it.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let mut path = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(AppError::new(
                        ErrorCategory::ArtifactError,
                        format!("object key escapes the store: {}", key),
                    )
                    .with_code("ART-003"))
                }
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, key: &str, source: &Path) -> Result<(), AppError> {
        let destination = self.path_for(key)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, &destination).await.map_err(|err| {
            AppError::new(
                ErrorCategory::ArtifactError,
                format!("failed to upload {}: {}", source.display(), err),
            )
            .with_code("ART-004")
            .with_context("key", key)
        })?;
        tracing::info!(key, "uploaded artifact");
        Ok(())
    }
}

/// Bucket-backed store. Credentials come from the standard AWS provider chain.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Build a client for `bucket`. An explicit `endpoint` also switches to path-style addressing.
    pub async fn connect(bucket: &str, region: Option<&str>, endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint.is_some())
            .build();
        tracing::debug!(bucket, region = ?shared.region(), "initialized S3 artifact store");
        Self::from_client(Client::from_conf(s3_config), bucket)
    }

    pub fn from_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &str, source: &Path) -> Result<(), AppError> {
        let body = tokio::fs::read(source).await.map_err(|err| {
            AppError::new(
                ErrorCategory::ArtifactError,
                format!("failed to upload {}: {}", source.display(), err),
            )
            .with_code("ART-004")
            .with_context("key", key)
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ArtifactError,
                    format!(
                        "failed to upload {} to s3://{}/{}: {}",
                        source.display(),
                        self.bucket,
                        key,
                        DisplayErrorContext(&err)
                    ),
                )
                .with_code("ART-005")
                .with_context("bucket", self.bucket.as_str())
                .with_context("key", key)
            })?;
        tracing::info!(key, bucket = %self.bucket, "uploaded artifact");
        Ok(())
    }
}

/// Upload each file to `folder`. Relative paths are read from `root`; keys keep the path as written.
pub async fn upload_files<S: AsRef<str>>(
    store: &dyn ArtifactStore,
    folder: &str,
    root: &Path,
    files: &[S],
) -> Result<usize, AppError> {
    for file in files {
        let file = file.as_ref();
        store.put(&object_key(folder, file), &root.join(file)).await?;
    }
    Ok(files.len())
}
