//! The deploy pipeline: package, upload, interpret, clean up.
//!
//! A [`Deployer`] holds no per-invocation state, so one instance can run
//! any number of deploys concurrently. Each call to [`Deployer::deploy`]
//! owns its temporary archive through an [`ArtifactGuard`], which removes
//! the file when the call returns or when its future is dropped.
//!
//! [`ArtifactGuard`]: crate::fs::ArtifactGuard

pub mod interpreter;
pub mod lines;
pub mod request;
pub mod sink;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::info;

use crate::error::DeployError;
use crate::fs::{ArtifactStore, build_archive};

pub use interpreter::{
    DeploymentEvent, DeploymentOutcome, ERROR_MARKER, IncompleteCause, Interpreter,
    SUCCESS_MARKER, classify_line,
};
pub use lines::LineBuffer;
pub use request::{
    AppIdentity, ArchiveBody, ArchiveRequest, ControlPlane, DeploymentRequest, ResponseStream,
};
pub use sink::{ConsoleSink, MemorySink, ProgressSink};
pub use upload::{StreamSummary, consume_stream};

/// Default overall deadline for one deploy call.
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Longest deadline accepted for one deploy call.
pub const MAX_DEPLOY_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

const FALLBACK_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Options for one deploy invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub archive: ArchiveRequest,
    pub description: Option<String>,
}

impl DeployOptions {
    pub fn new(application: impl Into<String>, source_directory: impl Into<PathBuf>) -> Self {
        Self {
            archive: ArchiveRequest {
                source_directory: source_directory.into(),
                application_name: application.into(),
                team: None,
            },
            description: None,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.archive.team = Some(team.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }
}

/// Result of a successful deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub application: AppIdentity,
    pub archive_bytes: u64,
    pub lines_displayed: usize,
    pub elapsed: Duration,
}

/// Runs deploy invocations against a control plane.
pub struct Deployer<C> {
    plane: Arc<C>,
    artifacts: ArtifactStore,
    sink: Arc<dyn ProgressSink>,
    timeout: Duration,
}

impl<C> Clone for Deployer<C> {
    fn clone(&self) -> Self {
        Self {
            plane: Arc::clone(&self.plane),
            artifacts: self.artifacts.clone(),
            sink: Arc::clone(&self.sink),
            timeout: self.timeout,
        }
    }
}

impl<C: ControlPlane> Deployer<C> {
    pub fn new(plane: Arc<C>, artifacts: ArtifactStore, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            plane,
            artifacts,
            sink,
            timeout: DEFAULT_DEPLOY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Package `options.archive.source_directory` and deploy it.
    ///
    /// Returns `Ok` only when the server reported success. Lookup and
    /// archive errors are returned before the deploy request is sent.
    pub async fn deploy(&self, options: &DeployOptions) -> Result<DeployReport, DeployError> {
        let started = Instant::now();
        let request = &options.archive;

        ensure_source_directory(&request.source_directory).await?;

        let application = self
            .plane
            .resolve_application(&request.application_name, request.team.as_deref())
            .await?;

        let mut parts = vec![application.name.as_str()];
        if let Some(team) = &application.team {
            parts.push(team.as_str());
        }
        let guard = self.artifacts.acquire(&parts);

        info!(
            app = %application.name,
            source = %request.source_directory.display(),
            "packaging application source"
        );
        let (artifact, guard) = build_archive(&request.source_directory, guard).await?;
        let archive_bytes = artifact.size_bytes;

        let archive = ArchiveBody::open(&artifact).await?;
        let deploy_request = DeploymentRequest {
            application: application.clone(),
            description: options.description.clone(),
            archive,
            artifact,
        };

        info!(app = %application.name, archive_bytes, "uploading archive");
        let deadline = deadline_after(self.timeout);
        let stream = match timeout_at(deadline, self.plane.create_deployment(deploy_request)).await
        {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(DeployError::DeploymentTimedOut {
                    after: self.timeout,
                    partial_output: Vec::new(),
                });
            }
        };

        let summary = consume_stream(stream, deadline, self.sink.as_ref()).await;
        drop(guard);

        let lines_displayed = summary.displayed.len();
        into_result(summary, self.timeout)?;

        info!(app = %application.name, lines_displayed, "deploy succeeded");
        Ok(DeployReport {
            application,
            archive_bytes,
            lines_displayed,
            elapsed: started.elapsed(),
        })
    }
}

/// Deadline `timeout` from now, clamped to a far-future instant.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(MAX_DEPLOY_TIMEOUT))
        .unwrap_or_else(|| now + FALLBACK_DEADLINE)
}

async fn ensure_source_directory(path: &std::path::Path) -> Result<(), DeployError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DeployError::InvalidSource {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(DeployError::InvalidSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn into_result(summary: StreamSummary, timeout: Duration) -> Result<(), DeployError> {
    let partial_output = summary.displayed;
    match summary.outcome {
        DeploymentOutcome::Succeeded => Ok(()),
        DeploymentOutcome::Failed { reason } => Err(DeployError::DeploymentFailed {
            reason,
            partial_output,
        }),
        DeploymentOutcome::Incomplete(IncompleteCause::StreamEndedWithoutTerminalMarker) => {
            Err(DeployError::StreamEndedWithoutTerminalMarker { partial_output })
        }
        DeploymentOutcome::Incomplete(IncompleteCause::TimedOut) => {
            Err(DeployError::DeploymentTimedOut {
                after: timeout,
                partial_output,
            })
        }
        DeploymentOutcome::Incomplete(IncompleteCause::Interrupted(reason)) => {
            if summary.bytes_received == 0 {
                Err(DeployError::upload_failed(reason))
            } else {
                Err(DeployError::StreamInterrupted {
                    reason,
                    partial_output,
                })
            }
        }
    }
}
