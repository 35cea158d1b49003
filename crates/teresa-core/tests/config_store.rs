use std::time::Duration;

use tempfile::TempDir;
use teresa_core::config::{ConfigStore, TeresaConfig};
use teresa_core::context::AppContext;

#[test]
fn missing_file_loads_empty_config() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::from_path(tmp.path().join("nested").join("config.toml"));

    let config = store.load().expect("missing file should load");
    assert_eq!(config, TeresaConfig::default());
    assert!(!store.config_path().exists());
}

#[test]
fn save_then_load_keeps_clusters_and_token() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::from_path(tmp.path().join("teresa").join("config.toml"));

    let mut config = TeresaConfig::new();
    config
        .set_cluster("prod", "https://teresa.example.com", false)
        .expect("valid cluster");
    config
        .set_cluster("local", "http://localhost:8080", false)
        .expect("valid cluster");
    config.set_token("secret".to_string()).expect("token set");
    config.deploy.timeout_secs = 90;
    store.save(&config).expect("save should succeed");

    let loaded = store.load().expect("load should succeed");
    assert_eq!(loaded, config);
    assert_eq!(loaded.current_cluster.as_deref(), Some("prod"));
    assert_eq!(loaded.clusters["prod"].token.as_deref(), Some("secret"));
    assert_eq!(loaded.clusters["local"].token, None);
    assert_eq!(
        loaded.deploy.timeout().expect("timeout in range"),
        Duration::from_secs(90)
    );
}

#[cfg(unix)]
#[test]
fn saved_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::from_path(tmp.path().join("config.toml"));
    store.save(&TeresaConfig::new()).expect("save should succeed");

    let mode = std::fs::metadata(store.config_path())
        .expect("metadata should succeed")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn malformed_file_reports_its_path() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "clusters = 3").expect("write should succeed");

    let err = ConfigStore::from_path(path.clone())
        .load()
        .expect_err("malformed file should fail");
    assert!(format!("{err:#}").contains(&path.display().to_string()));
}

#[test]
fn context_switches_clusters_and_persists() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::from_path(tmp.path().join("config.toml"));

    let mut ctx = AppContext::load(store.clone()).expect("context should load");
    ctx.config_mut()
        .set_cluster("prod", "https://teresa.example.com", false)
        .expect("valid cluster");
    ctx.config_mut()
        .set_cluster("staging", "https://staging.example.com", false)
        .expect("valid cluster");
    ctx.config_mut().use_cluster("staging").expect("known cluster");
    ctx.save().expect("save should succeed");

    let reloaded = AppContext::load(store).expect("context should reload");
    assert_eq!(reloaded.cluster_name().expect("cluster selected"), "staging");
    assert_eq!(
        reloaded.client().expect("client should build").server().to_string(),
        "https://staging.example.com/"
    );
}
