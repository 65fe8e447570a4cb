use crate::{
    cli::args::{CheckArgs, RunArgs},
    core::{
        materialize, normalize, validate, AppError, ConfigLoader, ConfigValidator,
        ArtifactStore, HttpControlPlane, JobRequest, JobRunner, LocalArtifactStore,
        PipelineExecutor, RunnerConfig, S3ArtifactStore, WorkflowLocator, WorkflowSchema,
    },
    logging::{self, ExecutionContext},
    Result,
};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn load_config(config: Option<&Path>, root: Option<&Path>) -> Result<RunnerConfig> {
    let config = ConfigLoader::load(config, root)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

/// The configured bucket, else the local mirror, else nothing.
async fn artifact_store(config: &RunnerConfig) -> Option<Arc<dyn ArtifactStore>> {
    let artifacts = &config.artifacts;
    if let Some(bucket) = &artifacts.bucket {
        let store = S3ArtifactStore::connect(
            bucket,
            artifacts.region.as_deref(),
            artifacts.endpoint.as_deref(),
        )
        .await;
        return Some(Arc::new(store));
    }
    artifacts
        .store_root
        .as_ref()
        .map(|root| Arc::new(LocalArtifactStore::new(root)) as Arc<dyn ArtifactStore>)
}

pub async fn run(args: RunArgs, context: ExecutionContext) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref(), args.root.as_deref())?;
    let guard = logging::init(context, &config.workspace.root)?;
    tracing::info!(
        job_id = %args.job_id,
        root = %config.workspace.root.display(),
        console = %guard.console_output(),
        "starting job"
    );

    let control_plane =
        HttpControlPlane::from_config(&config.control_plane).map_err(AppError::from)?;
    let mut runner = JobRunner::new(config.clone(), Arc::new(control_plane));
    if let Some(store) = artifact_store(&config).await {
        runner = runner.with_store(store);
    }
    if let Some(log_file) = guard.log_file_path() {
        runner = runner.with_log_file(log_file.to_path_buf());
    }

    match runner.run(&args.job_id).await {
        Ok(report) => {
            tracing::info!(
                job_id = %report.job_id,
                stages = report.pipeline.completed.len(),
                uploaded = report.uploaded,
                "job {}",
                report.status
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

pub async fn check(args: CheckArgs, context: ExecutionContext) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref(), args.root.as_deref())?;
    let guard = logging::init(context, &config.workspace.root)?;
    tracing::debug!(console = %guard.console_output(), "checking request");

    let text = fs::read_to_string(&args.request)
        .with_context(|| format!("failed to read request {}", args.request.display()))?;
    let mut request = JobRequest::from_json_str(&text)?;

    let requested = args
        .workflow
        .clone()
        .or_else(|| request.workflow_name().map(str::to_string));
    let locator = WorkflowLocator::from_config(&config.workspace, requested.as_deref());
    let schema = WorkflowSchema::load(&locator)?;

    normalize(&mut request, &schema, &args.job_id)?;
    let report = validate(&request, &schema);
    if !report.is_empty() {
        println!("{}", report);
        return Ok(ExitCode::FAILURE);
    }
    println!(
        "{}: request is valid ({} parameters, {} stages)",
        locator.name,
        schema.parameters.len(),
        schema.stages.len()
    );

    if args.print_args {
        let command_args = materialize(&request, &schema);
        let executor = PipelineExecutor::new(
            config.workspace.root.clone(),
            config.executor.interpreter.clone(),
        );
        for stage in schema.stages.values() {
            let invocation = executor.invocation(stage, &command_args);
            let mut line = format!("{} {}", invocation.program, invocation.script.display());
            for arg in &invocation.args {
                line.push(' ');
                line.push_str(arg);
            }
            println!("{}: {}", stage.name, line);
        }
    }

    Ok(ExitCode::SUCCESS)
}
