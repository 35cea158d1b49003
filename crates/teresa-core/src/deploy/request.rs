//! Request types and the remote control-plane seam.

use std::future::Future;
use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::DeployError;
use crate::fs::ArchiveArtifact;

/// Incremental response body of the deploy RPC.
pub type ResponseStream = BoxStream<'static, io::Result<Bytes>>;

/// What the user asked to package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub source_directory: PathBuf,
    pub application_name: String,
    pub team: Option<String>,
}

/// Identifiers the deploy RPC expects, as returned by the lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub name: String,
    pub team: Option<String>,
}

/// An opened archive ready to be streamed.
#[derive(Debug)]
pub struct ArchiveBody {
    file: File,
    len: u64,
    file_name: String,
}

impl ArchiveBody {
    /// Open the archive for reading. Fails before any network activity.
    pub async fn open(artifact: &ArchiveArtifact) -> Result<Self, DeployError> {
        let unavailable = |source: io::Error| DeployError::ArchiveUnavailable {
            path: artifact.path.clone(),
            source,
        };

        let file = File::open(&artifact.path).await.map_err(unavailable)?;
        let len = file.metadata().await.map_err(unavailable)?.len();
        let file_name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.tar.gz".to_string());

        Ok(Self {
            file,
            len,
            file_name,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Read the archive lazily, chunk by chunk.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }
}

/// One deploy RPC call. Consumed by value by [`ControlPlane::create_deployment`].
#[derive(Debug)]
pub struct DeploymentRequest {
    pub application: AppIdentity,
    pub description: Option<String>,
    pub archive: ArchiveBody,
    pub artifact: ArchiveArtifact,
}

/// The remote service as seen by the deploy pipeline.
pub trait ControlPlane: Send + Sync {
    /// Map a user-supplied app (and optional team) name to an identity.
    ///
    /// Unknown apps or teams yield [`DeployError::ApplicationNotFound`].
    fn resolve_application(
        &self,
        name: &str,
        team: Option<&str>,
    ) -> impl Future<Output = Result<AppIdentity, DeployError>> + Send;

    /// Send the archive and return the live response body.
    ///
    /// Connection failures and non-success statuses yield
    /// [`DeployError::UploadFailed`].
    fn create_deployment(
        &self,
        request: DeploymentRequest,
    ) -> impl Future<Output = Result<ResponseStream, DeployError>> + Send;
}
