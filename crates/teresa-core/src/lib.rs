//! Teresa Core Library
//!
//! Domain logic for the teresa command-line client: packaging application
//! sources, streaming them to the control plane, and interpreting the
//! deploy progress stream.

pub mod api;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod fs;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ClusterConfig, ConfigStore, DeploySettings, TeresaConfig};
    pub use crate::context::AppContext;

    // API
    pub use crate::api::{App, ServerUrl, Team, TeresaClient, User};

    // Deploy
    pub use crate::deploy::{
        AppIdentity, ConsoleSink, ControlPlane, DeployOptions, DeployReport, Deployer,
        DeploymentOutcome, ProgressSink,
    };

    // Errors
    pub use crate::error::{ApiError, DeployError};

    // Filesystem
    pub use crate::fs::{ArchiveArtifact, ArtifactStore};
}
