//! Cluster configuration.
//!
//! The config file lists the clusters the user can talk to, the token for
//! each, the selected cluster, and deploy settings.

pub mod paths;
pub mod schema;
pub mod store;

pub use paths::default_config_path;
pub use schema::{ClusterConfig, DeploySettings, TeresaConfig};
pub use store::ConfigStore;
