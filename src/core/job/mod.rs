#![allow(clippy::result_large_err)]

//! End-to-end lifecycle of one job: fetch, normalize, validate, run, upload, report.

use crate::core::artifacts::{self, ArtifactStore, ResultManifest};
use crate::core::config::RunnerConfig;
use crate::core::control_plane::ControlPlane;
use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use crate::core::executor::{PipelineExecutor, PipelineOutcome, StageRunner, TokioStageRunner};
use crate::core::materializer::materialize;
use crate::core::normalizer::normalize;
use crate::core::schema::{WorkflowLocator, WorkflowSchema};
use crate::core::types::JobStatus;
use crate::core::validator::validate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What a successful job produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    pub status: JobStatus,
    pub pipeline: PipelineOutcome,
    pub uploaded: usize,
}

pub struct JobRunner {
    config: RunnerConfig,
    control_plane: Arc<dyn ControlPlane>,
    store: Option<Arc<dyn ArtifactStore>>,
    stage_runner: Arc<dyn StageRunner>,
    reporter: Box<dyn ErrorReporter + Send + Sync>,
    log_file: Option<PathBuf>,
}

impl JobRunner {
    pub fn new(config: RunnerConfig, control_plane: Arc<dyn ControlPlane>) -> Self {
        JobRunner {
            config,
            control_plane,
            store: None,
            stage_runner: Arc::new(TokioStageRunner),
            reporter: Box::new(DefaultErrorReporter),
            log_file: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stage_runner(mut self, runner: Arc<dyn StageRunner>) -> Self {
        self.stage_runner = runner;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ErrorReporter + Send + Sync>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Job log uploaded after every run, successful or not.
    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Run the job to completion. Failures are reported to the control plane before returning.
    pub async fn run(&self, job_id: &str) -> Result<JobReport, AppError> {
        let start = Instant::now();
        let result = self.execute(job_id).await;

        if let Err(err) = &result {
            self.reporter.report_error(err);
            if let Err(report_err) = self.control_plane.set_failed(job_id, &err.message).await {
                self.reporter.report_error(&report_err);
            }
        } else {
            tracing::info!(
                job_id,
                "job completed in {}",
                humantime::format_duration(std::time::Duration::from_secs(
                    start.elapsed().as_secs()
                ))
            );
        }

        self.upload_job_log(job_id).await;
        result
    }

    async fn execute(&self, job_id: &str) -> Result<JobReport, AppError> {
        let workspace = &self.config.workspace;

        let mut request = self.control_plane.fetch_job_config(job_id).await?;
        let locator = WorkflowLocator::from_config(workspace, request.workflow_name());
        let schema = WorkflowSchema::load(&locator)?;
        normalize(&mut request, &schema, job_id)?;
        tracing::info!(job_id, workflow = %locator.name, "workflow parsed");

        validate(&request, &schema).into_result()?;
        tracing::info!(
            job_id,
            "job config: {}",
            serde_json::to_string(request.as_map())?
        );

        self.control_plane.set_running(job_id).await?;
        tracing::info!(job_id, "job is running");

        let args = materialize(&request, &schema);
        let executor = PipelineExecutor::with_runner(
            workspace.root.clone(),
            self.config.executor.interpreter.clone(),
            self.stage_runner.clone(),
        );
        let pipeline = executor.run(&schema, &args).await?;

        let manifest =
            ResultManifest::load(&workspace.root.join(&self.config.artifacts.payload_manifest))?;
        let extras = artifacts::load_upload_manifest(
            &workspace.root.join(&self.config.artifacts.upload_manifest),
        )?;
        let uploaded = match &self.store {
            Some(store) => {
                let folder = self.control_plane.job_folder(job_id).await?;
                let mut uploaded = artifacts::upload_files(
                    store.as_ref(),
                    &folder,
                    &workspace.root,
                    &manifest.files(),
                )
                .await?;
                uploaded +=
                    artifacts::upload_files(store.as_ref(), &folder, &workspace.root, &extras)
                        .await?;
                uploaded
            }
            None => {
                self.reporter.report_warning(
                    "no artifact store configured; results not uploaded",
                    Some(format!("job_id={}", job_id)),
                );
                0
            }
        };

        self.control_plane
            .set_completed(job_id, manifest.to_value())
            .await?;

        Ok(JobReport {
            job_id: job_id.to_string(),
            status: JobStatus::Completed,
            pipeline,
            uploaded,
        })
    }

    async fn upload_job_log(&self, job_id: &str) {
        let (Some(store), Some(log_file)) = (&self.store, &self.log_file) else {
            return;
        };
        let outcome = async {
            let folder = self.control_plane.job_folder(job_id).await?;
            let name = log_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "job.log".to_string());
            store
                .put(&artifacts::object_key(&folder, &name), log_file)
                .await
        }
        .await;
        if let Err(err) = outcome {
            self.reporter
                .report_warning(&format!("job log upload failed: {}", err), None);
        }
    }
}
