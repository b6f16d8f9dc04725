//! Orchestrator integration tests.
//!
//! Tests the full flow: config parsing -> module build -> start ->
//! health check -> shutdown.

use soctide_core::config::SoctideConfig;
use soctide_core::pipeline::HealthStatus;
use soctide_daemon::orchestrator::Orchestrator;

/// Minimal config pointing all stores and sources at a temp dir.
fn test_config(dir: &std::path::Path) -> SoctideConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "info"
pid_file = ""

[ingest]
enabled = true
file_paths = []
directories = []
max_batch_size = 10
batch_interval_secs = 0.2

[governance]
store_dir = "{}"
approval_timeout_secs = 3600

[analysis]
anomaly_weight = 0.4
classification_weight = 0.6
dedup_window_secs = 60
alert_history_capacity = 50
"#,
        dir.join("governance").display()
    );
    SoctideConfig::parse(&toml_str).expect("failed to parse test config")
}

#[tokio::test]
async fn test_build_from_config_prepares_governance_store() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::build_from_config(test_config(dir.path())).unwrap();
    assert!(orchestrator.hub().store_dir().is_dir());
    assert!(!orchestrator.hub().is_killswitch_active());
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.analysis.anomaly_weight = 7.5;
    assert!(Orchestrator::build_from_config(config).is_err());
}

#[tokio::test]
async fn test_build_fails_on_corrupt_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("governance");
    std::fs::create_dir_all(&store).unwrap();
    std::fs::write(store.join("overrides.json"), "definitely not json").unwrap();

    assert!(Orchestrator::build_from_config(test_config(dir.path())).is_err());
}

#[tokio::test]
async fn test_lifecycle_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::build_from_config(test_config(dir.path())).unwrap();

    orchestrator.start_modules().await.unwrap();
    let health = orchestrator.health().await;
    assert!(health.status.is_healthy());
    assert_eq!(health.modules.len(), 2);

    orchestrator.stop_modules().await.unwrap();
    let health = orchestrator.health().await;
    assert!(health.status.is_unhealthy());
}

#[tokio::test]
async fn test_active_killswitch_degrades_health() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::build_from_config(test_config(dir.path())).unwrap();
    orchestrator.start_modules().await.unwrap();

    orchestrator
        .hub()
        .activate_killswitch("operator", "drill")
        .unwrap();
    let health = orchestrator.health().await;
    assert!(matches!(health.status, HealthStatus::Degraded(_)));

    orchestrator.hub().deactivate_killswitch("operator").unwrap();
    let health = orchestrator.health().await;
    assert!(health.status.is_healthy());

    orchestrator.stop_modules().await.unwrap();
}
