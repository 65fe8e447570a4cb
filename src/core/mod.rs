pub mod artifacts;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod executor;
pub mod job;
pub mod materializer;
pub mod normalizer;
pub mod request;
pub mod schema;
pub mod types;
pub mod validator;

pub use artifacts::{
    ArtifactStore, LocalArtifactStore, ResultFile, ResultManifest, S3ArtifactStore,
};
pub use config::{ConfigLoader, ConfigValidator, RunnerConfig};
pub use control_plane::{ControlPlane, ControlPlaneError, Credentials, HttpControlPlane};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use executor::{
    PipelineExecutor, PipelineOutcome, StageInvocation, StageOutput, StageReport, StageRunner,
    TokioStageRunner,
};
pub use job::{JobReport, JobRunner};
pub use materializer::{materialize, CommandArgs};
pub use normalizer::normalize;
pub use request::JobRequest;
pub use schema::{ParameterSpec, ParameterType, StageSpec, WorkflowLocator, WorkflowSchema};
pub use types::*;
pub use validator::{validate, ValidationReport, Violation, ViolationKind};
