//! Pipeline orchestration -- assembly, channel wiring, and lifecycle
//! management.
//!
//! The [`Orchestrator`] is the central coordinator of `soctide-daemon`.
//! It loads configuration, builds the governance hub, the analysis
//! pipeline, and the ingestion controller, wires the kill-switch probe
//! and the alert channel between them, and runs the main signal loop.
//!
//! # Startup Order
//!
//! 1. Governance hub (fatal when the store is unavailable or corrupt)
//! 2. Analysis pipeline (consumer)
//! 3. Ingestion controller (producer)
//!
//! # Shutdown Order (producers first)
//!
//! 1. Ingestion controller (drain buffer, final flush)
//! 2. Analysis pipeline

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};

use soctide_analysis::{AnalysisConfig, AnalysisPipeline};
use soctide_core::config::SoctideConfig;
use soctide_core::event::AlertEvent;
use soctide_core::pipeline::{BatchProcessor, HealthStatus, Pipeline};
use soctide_governance::GovernanceHub;
use soctide_ingest::{IngestionConfig, IngestionController, IngestionControllerBuilder};

use crate::scorers::{KeywordScorer, LengthAnomalyScorer};

const ALERT_CHANNEL_CAPACITY: usize = 256;

/// Health snapshot of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealth {
    /// Module name.
    pub name: String,
    /// Reported status.
    pub status: HealthStatus,
}

/// Aggregated daemon health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonHealth {
    /// Worst status across all modules.
    pub status: HealthStatus,
    /// Seconds since the orchestrator was built.
    pub uptime_secs: u64,
    /// Per-module detail.
    pub modules: Vec<ModuleHealth>,
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: SoctideConfig,
    hub: Arc<GovernanceHub>,
    analysis: Arc<Mutex<AnalysisPipeline>>,
    ingestion: Arc<Mutex<IngestionController>>,
    shutdown_tx: broadcast::Sender<()>,
    alert_logger: Option<tokio::task::JoinHandle<()>>,
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = SoctideConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Fails fatally when the governance store cannot be prepared --
    /// the daemon never runs without an enforceable kill switch and
    /// audit trail.
    pub fn build_from_config(config: SoctideConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        tracing::info!("initializing governance hub");
        let hub = Arc::new(
            GovernanceHub::new(
                &config.governance.store_dir,
                Duration::from_secs(config.governance.approval_timeout_secs),
            )
            .map_err(|e| anyhow::anyhow!("governance store unusable: {}", e))?,
        );

        let (alert_tx, alert_rx) = mpsc::channel::<AlertEvent>(ALERT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!("initializing analysis pipeline");
        let suppression_hub = Arc::clone(&hub);
        let analysis = AnalysisPipeline::builder()
            .config(AnalysisConfig::from_core(&config.analysis))
            .scorer(Arc::new(KeywordScorer::new()))
            .scorer(Arc::new(LengthAnomalyScorer::default()))
            .killswitch(hub.probe())
            .suppressions(Arc::new(move || {
                suppression_hub.active_suppressions().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to read suppressions, treating as none");
                    Vec::new()
                })
            }))
            .alert_sender(alert_tx)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build analysis pipeline: {}", e))?;
        let analysis = Arc::new(Mutex::new(analysis));

        tracing::info!("initializing ingestion controller");
        let processor: Arc<Mutex<dyn BatchProcessor>> = analysis.clone();
        // Sources listed in the config are registered by the builder.
        let controller = IngestionControllerBuilder::new()
            .config(IngestionConfig::from_core(&config.ingest))
            .processor(processor)
            .killswitch(hub.probe())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build ingestion controller: {}", e))?;

        let alert_logger = tokio::spawn(log_alerts(alert_rx, shutdown_tx.subscribe()));

        tracing::info!("orchestrator initialized");
        Ok(Self {
            config,
            hub,
            analysis,
            ingestion: Arc::new(Mutex::new(controller)),
            shutdown_tx,
            alert_logger: Some(alert_logger),
            start_time: Instant::now(),
        })
    }

    /// Start all modules and block until a shutdown signal arrives.
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.general.pid_file.is_empty() {
            write_pid_file(Path::new(&self.config.general.pid_file))?;
        }

        if let Err(e) = self.start_modules().await {
            // Rollback whatever managed to start.
            tracing::warn!("startup failed, rolling back already-started modules");
            let _ = self.stop_modules().await;
            if !self.config.general.pid_file.is_empty() {
                remove_pid_file(Path::new(&self.config.general.pid_file));
            }
            return Err(e);
        }

        tracing::info!("soctide-daemon running -- modules active");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        let _ = self.shutdown_tx.send(());
        self.stop_modules().await?;

        if let Some(task) = self.alert_logger.take() {
            let _ = task.await;
        }
        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }

        tracing::info!("soctide-daemon shut down");
        Ok(())
    }

    /// Start analysis before ingestion so batches always have a
    /// consumer.
    pub async fn start_modules(&self) -> Result<()> {
        self.analysis
            .lock()
            .await
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start analysis pipeline: {}", e))?;
        tracing::info!("analysis pipeline started");

        if self.config.ingest.enabled {
            self.ingestion
                .lock()
                .await
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start ingestion: {}", e))?;
            tracing::info!("ingestion started");
        } else {
            tracing::warn!("ingestion disabled by config");
        }
        Ok(())
    }

    /// Stop ingestion first so its final flush still has a consumer.
    pub async fn stop_modules(&self) -> Result<()> {
        let mut failed = false;
        if self.config.ingest.enabled {
            if let Err(e) = self.ingestion.lock().await.stop().await {
                tracing::error!(error = %e, "failed to stop ingestion");
                failed = true;
            }
        }
        if let Err(e) = self.analysis.lock().await.stop().await {
            tracing::error!(error = %e, "failed to stop analysis pipeline");
            failed = true;
        }
        if failed {
            anyhow::bail!("one or more modules failed to stop cleanly");
        }
        Ok(())
    }

    /// Current aggregated health.
    pub async fn health(&self) -> DaemonHealth {
        let modules = vec![
            ModuleHealth {
                name: "ingest".to_owned(),
                status: self.ingestion.lock().await.health_check().await,
            },
            ModuleHealth {
                name: "analysis".to_owned(),
                status: self.analysis.lock().await.health_check().await,
            },
        ];

        let status = modules
            .iter()
            .map(|m| &m.status)
            .fold(HealthStatus::Healthy, |worst, s| match (worst, s) {
                (HealthStatus::Unhealthy(r), _) => HealthStatus::Unhealthy(r),
                (_, HealthStatus::Unhealthy(r)) => HealthStatus::Unhealthy(r.clone()),
                (HealthStatus::Degraded(r), _) => HealthStatus::Degraded(r),
                (_, HealthStatus::Degraded(r)) => HealthStatus::Degraded(r.clone()),
                _ => HealthStatus::Healthy,
            });

        DaemonHealth {
            status,
            uptime_secs: self.start_time.elapsed().as_secs(),
            modules,
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &SoctideConfig {
        &self.config
    }

    /// Shared governance hub handle.
    pub fn hub(&self) -> Arc<GovernanceHub> {
        Arc::clone(&self.hub)
    }

    /// Shared analysis pipeline handle.
    pub fn analysis(&self) -> Arc<Mutex<AnalysisPipeline>> {
        Arc::clone(&self.analysis)
    }

    /// Shared ingestion controller handle.
    pub fn ingestion(&self) -> Arc<Mutex<IngestionController>> {
        Arc::clone(&self.ingestion)
    }
}

/// Log emitted alert events until shutdown.
///
/// The analysis pipeline drops events when this consumer lags; the
/// channel capacity gives enough slack for bursts.
async fn log_alerts(
    mut alert_rx: mpsc::Receiver<AlertEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe_event = alert_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        tracing::info!(
                            alert_id = event.alert.alert_id.as_str(),
                            priority = %event.alert.priority,
                            classification = event.alert.classification.as_str(),
                            trace_id = event.metadata.trace_id.as_str(),
                            "alert emitted"
                        );
                    }
                    None => break,
                }
            }
            _ = shutdown_rx.recv() => {
                // Drain whatever is already queued, then exit.
                while let Ok(event) = alert_rx.try_recv() {
                    tracing::info!(
                        alert_id = event.alert.alert_id.as_str(),
                        priority = %event.alert.priority,
                        "alert emitted (drained at shutdown)"
                    );
                }
                break;
            }
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances. The file is created
/// with `create_new` so a stale instance is detected atomically.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;
    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

