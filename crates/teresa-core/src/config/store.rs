//! Config store for loading and saving config.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{TeresaConfig, paths::default_config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_default_location() -> anyhow::Result<Self> {
        Ok(Self::from_path(default_config_path()?))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<TeresaConfig> {
        if !self.config_path.exists() {
            return Ok(TeresaConfig::new());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;
        toml::from_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })
    }

    pub fn save(&self, config: &TeresaConfig) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        // The file holds API tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.config_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| {
                    format!(
                        "Failed to restrict permissions on {}",
                        self.config_path.display()
                    )
                })?;
        }
        Ok(())
    }
}
