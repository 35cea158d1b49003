//! Error types for the deploy pipeline and the API client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a deploy invocation.
///
/// Variants that carry `partial_output` hold every line that was already
/// shown to the user before the invocation ended.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid source directory {}: {reason}", path.display())]
    InvalidSource { path: PathBuf, reason: String },

    #[error("Failed to build archive {}: {source}", path.display())]
    ArchiveBuildFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive {} is unavailable: {source}", path.display())]
    ArchiveUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed: {reason}")]
    UploadFailed {
        reason: String,
        #[source]
        source: Option<ApiError>,
    },

    #[error("Deploy stream interrupted: {reason}")]
    StreamInterrupted {
        reason: String,
        partial_output: Vec<String>,
    },

    #[error("Deploy timed out after {}s; the remote deployment may still complete", after.as_secs())]
    DeploymentTimedOut {
        after: Duration,
        partial_output: Vec<String>,
    },

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Deploy failed: {reason}")]
    DeploymentFailed {
        reason: String,
        partial_output: Vec<String>,
    },

    #[error("Deploy stream ended without a terminal status; the remote state is unknown")]
    StreamEndedWithoutTerminalMarker { partial_output: Vec<String> },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DeployError {
    /// Upload failure with no underlying error to chain.
    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
            source: None,
        }
    }

    /// Upload failure caused by an API error, kept as the source.
    pub fn upload_error(source: impl Into<ApiError>) -> Self {
        let source = source.into();
        Self::UploadFailed {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// True when the remote deployment state cannot be known from this side.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Self::DeploymentTimedOut { .. }
                | Self::StreamInterrupted { .. }
                | Self::StreamEndedWithoutTerminalMarker { .. }
        )
    }

    /// Lines already displayed before the failure, if the error tracks them.
    pub fn partial_output(&self) -> &[String] {
        match self {
            Self::StreamInterrupted { partial_output, .. }
            | Self::DeploymentFailed { partial_output, .. }
            | Self::DeploymentTimedOut { partial_output, .. }
            | Self::StreamEndedWithoutTerminalMarker { partial_output } => partial_output,
            _ => &[],
        }
    }
}

/// Errors returned by the HTTP API client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authorized; run `teresa login` first")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid server URL: {0}")]
    InvalidServer(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_outcomes_are_distinct_from_failures() {
        let timed_out = DeployError::DeploymentTimedOut {
            after: Duration::from_secs(300),
            partial_output: vec!["building...".to_string()],
        };
        let ended = DeployError::StreamEndedWithoutTerminalMarker {
            partial_output: Vec::new(),
        };
        let failed = DeployError::DeploymentFailed {
            reason: "boom".to_string(),
            partial_output: vec!["step1".to_string()],
        };
        let rejected = DeployError::upload_failed("refused");

        assert!(timed_out.is_ambiguous());
        assert!(ended.is_ambiguous());
        assert!(!failed.is_ambiguous());
        assert_eq!(timed_out.partial_output(), ["building...".to_string()]);
        assert_eq!(failed.partial_output(), ["step1".to_string()]);
        assert!(rejected.partial_output().is_empty());
    }

    #[test]
    fn timeout_message_mentions_duration() {
        let err = DeployError::DeploymentTimedOut {
            after: Duration::from_secs(90),
            partial_output: Vec::new(),
        };
        assert!(err.to_string().contains("90s"));
    }

    #[test]
    fn upload_error_keeps_its_source() {
        use std::error::Error as _;

        let err = DeployError::upload_error(ApiError::Status {
            status: 500,
            body: "disk full".to_string(),
        });
        assert!(err.to_string().contains("disk full"));
        let source = err.source().expect("source should be chained");
        assert!(source.to_string().contains("HTTP 500"));

        assert!(DeployError::upload_failed("refused").source().is_none());
    }
}
