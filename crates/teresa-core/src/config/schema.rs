//! Schema for config.toml.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerUrl;
use crate::deploy::{DEFAULT_DEPLOY_TIMEOUT, MAX_DEPLOY_TIMEOUT};

/// Root of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeresaConfig {
    /// Cluster used by commands that talk to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_cluster: Option<String>,

    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,

    #[serde(default)]
    pub deploy: DeploySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Overall deadline for one deploy call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Where temporary archives are written (defaults to the system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_DEPLOY_TIMEOUT.as_secs()
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            temp_dir: None,
        }
    }
}

impl DeploySettings {
    /// The configured deadline, rejected when zero or above the maximum.
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        let max = MAX_DEPLOY_TIMEOUT.as_secs();
        if !(1..=max).contains(&self.timeout_secs) {
            anyhow::bail!(
                "deploy.timeout_secs must be between 1 and {}, got {}",
                max,
                self.timeout_secs
            );
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }
}

impl TeresaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a cluster. The server URL is validated first.
    ///
    /// Replacing a cluster keeps its token only if the server is unchanged.
    pub fn set_cluster(
        &mut self,
        name: &str,
        server: &str,
        make_current: bool,
    ) -> anyhow::Result<()> {
        if name.trim().is_empty() {
            anyhow::bail!("Cluster name cannot be empty");
        }
        let server = ServerUrl::parse(server)?.to_string();

        let token = self
            .clusters
            .get(name)
            .filter(|existing| existing.server == server)
            .and_then(|existing| existing.token.clone());
        self.clusters
            .insert(name.to_string(), ClusterConfig { server, token });

        if make_current || self.current_cluster.is_none() {
            self.current_cluster = Some(name.to_string());
        }
        Ok(())
    }

    pub fn use_cluster(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.clusters.contains_key(name) {
            anyhow::bail!(
                "Cluster '{}' is not configured; add it with `teresa config set-cluster`",
                name
            );
        }
        self.current_cluster = Some(name.to_string());
        Ok(())
    }

    /// The selected cluster and its settings.
    pub fn current_cluster(&self) -> anyhow::Result<(&str, &ClusterConfig)> {
        let name = self.current_cluster.as_deref().ok_or_else(|| {
            anyhow::anyhow!("You have to select a cluster first, check `teresa config --help`")
        })?;
        let cluster = self.clusters.get(name).ok_or_else(|| {
            anyhow::anyhow!("Current cluster '{}' is missing from the config file", name)
        })?;
        Ok((name, cluster))
    }

    /// Store a token for the selected cluster.
    pub fn set_token(&mut self, token: String) -> anyhow::Result<()> {
        let name = self
            .current_cluster
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No cluster selected"))?;
        let cluster = self
            .clusters
            .get_mut(&name)
            .ok_or_else(|| anyhow::anyhow!("Current cluster '{}' is missing", name))?;
        cluster.token = Some(token);
        Ok(())
    }
}
