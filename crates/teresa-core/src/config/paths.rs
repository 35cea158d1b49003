//! Config path resolution helpers.

use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `<config_dir>/teresa/config.toml`, falling back to `~/.teresa/config.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join("teresa").join(CONFIG_FILE_NAME));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(home.join(".teresa").join(CONFIG_FILE_NAME))
}
