//! Application context for unified dependency injection.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ServerUrl, TeresaClient};
use crate::config::{ConfigStore, TeresaConfig};
use crate::deploy::{Deployer, ProgressSink};
use crate::fs::ArtifactStore;

/// Loaded configuration plus the services built from it.
///
/// Frontends create this once per command and pass explicit values down;
/// nothing in the core reads process-wide state.
#[derive(Debug, Clone)]
pub struct AppContext {
    store: ConfigStore,
    config: TeresaConfig,
}

impl AppContext {
    pub fn load(store: ConfigStore) -> anyhow::Result<Self> {
        let config = store.load()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &TeresaConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TeresaConfig {
        &mut self.config
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.store.save(&self.config)
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn cluster_name(&self) -> anyhow::Result<&str> {
        Ok(self.config.current_cluster()?.0)
    }

    /// Client for the selected cluster, carrying its token if any.
    pub fn client(&self) -> anyhow::Result<TeresaClient> {
        let (_, cluster) = self.config.current_cluster()?;
        let server = ServerUrl::parse(&cluster.server)?;
        Ok(TeresaClient::new(server, cluster.token.clone())?)
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        match &self.config.deploy.temp_dir {
            Some(dir) => ArtifactStore::new(dir.clone()),
            None => ArtifactStore::default(),
        }
    }

    pub fn deploy_timeout(&self) -> anyhow::Result<Duration> {
        self.config.deploy.timeout()
    }

    /// A deployer for the selected cluster. `timeout` overrides the config.
    pub fn deployer(
        &self,
        sink: Arc<dyn ProgressSink>,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Deployer<TeresaClient>> {
        let timeout = match timeout {
            Some(timeout) => timeout,
            None => self.deploy_timeout()?,
        };
        let client = Arc::new(self.client()?);
        Ok(Deployer::new(client, self.artifact_store(), sink).with_timeout(timeout))
    }
}
