//! Presentation bridge -- the API surface the operator UI talks to.
//!
//! The UI layer itself lives outside this crate; the bridge exposes
//! everything it needs as plain async methods with serde-serializable
//! results, so any frontend (or an integration test) can drive the
//! daemon without touching module internals.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use soctide_analysis::{AnalysisPipeline, AnalysisStats};
use soctide_core::error::SoctideError;
use soctide_core::pipeline::Pipeline;
use soctide_core::types::{Alert, BufferStats, ThreatCategory};
use soctide_governance::{
    AppliedOverride, ApprovalRequest, AuditEvent, AuditFilter, GovernanceHub, KillSwitchState,
    OverrideAction,
};
use soctide_ingest::{IngestionController, IngestionStatus};

use crate::orchestrator::Orchestrator;

/// Combined runtime statistics for the operator view.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStats {
    /// Analysis pipeline counters.
    pub analysis: AnalysisStats,
    /// Ingestion source and batch status.
    pub ingestion: IngestionStatus,
    /// Micro-batch buffer snapshot.
    pub buffer: BufferStats,
    /// Whether the kill switch is currently active.
    pub killswitch_active: bool,
}

/// Operator-facing handle over the running daemon.
///
/// Cheap to clone; all state is shared with the orchestrator.
#[derive(Clone)]
pub struct DaemonBridge {
    hub: Arc<GovernanceHub>,
    analysis: Arc<Mutex<AnalysisPipeline>>,
    ingestion: Arc<Mutex<IngestionController>>,
}

impl DaemonBridge {
    /// Create a bridge sharing the orchestrator's module handles.
    pub fn new(orchestrator: &Orchestrator) -> Self {
        Self {
            hub: orchestrator.hub(),
            analysis: orchestrator.analysis(),
            ingestion: orchestrator.ingestion(),
        }
    }

    // --- alerts and stats ---

    /// Most recent alerts, newest first.
    pub async fn get_latest_alerts(&self, limit: usize) -> Vec<Alert> {
        self.analysis.lock().await.latest_alerts(limit)
    }

    /// Combined runtime statistics.
    pub async fn get_stats(&self) -> DaemonStats {
        let analysis = self.analysis.lock().await.stats();
        let ingestion_guard = self.ingestion.lock().await;
        let ingestion = ingestion_guard.status().await;
        let buffer = ingestion_guard.buffer_stats().await;
        drop(ingestion_guard);

        DaemonStats {
            analysis,
            ingestion,
            buffer,
            killswitch_active: self.hub.is_killswitch_active(),
        }
    }

    // --- ingestion control ---

    /// Register an additional file source. Only allowed while
    /// ingestion is stopped.
    pub async fn add_file_source(&self, id: &str, path: &str) -> Result<(), SoctideError> {
        self.ingestion
            .lock()
            .await
            .add_file_source(id, path)
            .map_err(Into::into)
    }

    /// Start the ingestion controller.
    pub async fn start_ingestion(&self) -> Result<(), SoctideError> {
        self.ingestion.lock().await.start().await
    }

    /// Stop the ingestion controller and flush remaining records.
    pub async fn stop_ingestion(&self) -> Result<(), SoctideError> {
        self.ingestion.lock().await.stop().await
    }

    // --- governance passthrough ---

    /// Activate the kill switch on behalf of an operator.
    pub fn activate_killswitch(&self, actor: &str, reason: &str) -> Result<bool, SoctideError> {
        self.hub
            .activate_killswitch(actor, reason)
            .map_err(Into::into)
    }

    /// Deactivate the kill switch on behalf of an operator.
    pub fn deactivate_killswitch(&self, actor: &str) -> Result<bool, SoctideError> {
        self.hub.deactivate_killswitch(actor).map_err(Into::into)
    }

    /// Kill switch state record, when active.
    pub fn killswitch_state(&self) -> Result<Option<KillSwitchState>, SoctideError> {
        self.hub.killswitch_state().map_err(Into::into)
    }

    /// File a new approval request.
    pub fn request_approval(
        &self,
        requester: &str,
        action: &str,
        reason: &str,
    ) -> Result<ApprovalRequest, SoctideError> {
        self.hub
            .request_approval(requester, action, reason)
            .map_err(Into::into)
    }

    /// Approve a pending request.
    pub fn approve(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, SoctideError> {
        self.hub
            .approve(request_id, reviewer, notes)
            .map_err(Into::into)
    }

    /// Reject a pending request.
    pub fn reject(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, SoctideError> {
        self.hub
            .reject(request_id, reviewer, notes)
            .map_err(Into::into)
    }

    /// All approval requests, with expiry applied.
    pub fn approval_requests(&self) -> Result<Vec<ApprovalRequest>, SoctideError> {
        self.hub.approval_requests().map_err(Into::into)
    }

    /// Apply an approved override.
    ///
    /// A `ForceReanalysis` override also clears the dedup state of the
    /// running analysis pipeline immediately.
    pub async fn apply_override(
        &self,
        request_id: &str,
        action: OverrideAction,
        applied_by: &str,
    ) -> Result<AppliedOverride, SoctideError> {
        let applied = self.hub.apply_override(request_id, action, applied_by)?;
        if applied.action == OverrideAction::ForceReanalysis {
            self.analysis.lock().await.reset_dedup();
        }
        Ok(applied)
    }

    /// Roll back an applied override.
    pub fn rollback_override(
        &self,
        override_id: &str,
        actor: &str,
    ) -> Result<AppliedOverride, SoctideError> {
        self.hub
            .rollback_override(override_id, actor)
            .map_err(Into::into)
    }

    /// Currently suppressed threat categories.
    pub fn active_suppressions(&self) -> Result<Vec<ThreatCategory>, SoctideError> {
        self.hub.active_suppressions().map_err(Into::into)
    }

    /// Audit trail, filtered.
    pub fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, SoctideError> {
        self.hub.audit_events(filter).map_err(Into::into)
    }
}
