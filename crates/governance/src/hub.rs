//! 거버넌스 허브 — 단일 진입점
//!
//! [`GovernanceHub`]는 킬 스위치, 승인 워크플로, 오버라이드 관리자를
//! 하나로 묶고, 모든 상태 변화마다 정확히 한 건의 감사 이벤트를
//! 남깁니다. 하위 관리자는 영속만 담당하고 감사 기록은 허브에서만
//! 작성합니다.
//!
//! 생성 시점에 스토어 디렉토리를 준비하고 기존 스토어를 검증합니다.
//! 디렉토리를 만들 수 없거나 스토어가 손상되어 있으면 생성 자체가
//! 실패합니다. 손상된 거버넌스 상태 위에서 조용히 기동하지 않습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use soctide_core::pipeline::KillswitchProbe;
use soctide_core::types::ThreatCategory;

use crate::approval::{ApprovalRequest, ApprovalWorkflow};
use crate::audit::{AuditEvent, AuditFilter, AuditLogger};
use crate::error::GovernanceError;
use crate::killswitch::{KillSwitch, KillSwitchState};
use crate::overrides::{AppliedOverride, OverrideAction, OverrideManager, RollbackManager};

/// 거버넌스 계층 진입점
pub struct GovernanceHub {
    store_dir: PathBuf,
    killswitch: KillSwitch,
    audit: AuditLogger,
    approvals: ApprovalWorkflow,
    overrides: OverrideManager,
    rollback: RollbackManager,
}

impl GovernanceHub {
    /// 허브를 생성하고 스토어를 준비합니다.
    ///
    /// 스토어 디렉토리 생성 실패와 기존 스토어 손상은 모두 치명적
    /// 에러입니다.
    pub fn new(
        store_dir: impl AsRef<Path>,
        approval_timeout: Duration,
    ) -> Result<Self, GovernanceError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&store_dir).map_err(|e| GovernanceError::Unavailable {
            path: store_dir.display().to_string(),
            reason: format!("create store dir failed: {e}"),
        })?;

        let hub = Self {
            killswitch: KillSwitch::new(&store_dir),
            audit: AuditLogger::new(&store_dir),
            approvals: ApprovalWorkflow::new(&store_dir, approval_timeout),
            overrides: OverrideManager::new(&store_dir),
            rollback: RollbackManager::new(&store_dir),
            store_dir,
        };

        // 기동 시 스토어 무결성 검증. 손상 감지 시 즉시 실패.
        hub.approvals.list()?;
        hub.overrides.list()?;
        hub.audit.events(&AuditFilter::default())?;
        if hub.killswitch.is_active() {
            let state = hub.killswitch.state()?;
            tracing::warn!(
                reason = state.map(|s| s.reason).as_deref().unwrap_or("unknown"),
                "killswitch already active at startup"
            );
        }

        tracing::info!(store_dir = %hub.store_dir.display(), "governance hub ready");
        Ok(hub)
    }

    /// 스토어 디렉토리 경로
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// 킬 스위치를 활성화합니다. 실제 전환이 일어난 경우에만 감사
    /// 이벤트를 남깁니다.
    pub fn activate_killswitch(
        &self,
        actor: &str,
        reason: &str,
    ) -> Result<bool, GovernanceError> {
        let changed = self.killswitch.activate(reason)?;
        if changed {
            self.audit
                .log_event(actor, "killswitch.activate", reason, "ok")?;
        }
        Ok(changed)
    }

    /// 킬 스위치를 비활성화합니다. 실제 전환이 일어난 경우에만 감사
    /// 이벤트를 남깁니다.
    pub fn deactivate_killswitch(&self, actor: &str) -> Result<bool, GovernanceError> {
        let changed = self.killswitch.deactivate()?;
        if changed {
            self.audit.log_event(actor, "killswitch.deactivate", "", "ok")?;
        }
        Ok(changed)
    }

    /// 킬 스위치 활성 여부
    pub fn is_killswitch_active(&self) -> bool {
        self.killswitch.is_active()
    }

    /// 킬 스위치 활성 상태 기록
    pub fn killswitch_state(&self) -> Result<Option<KillSwitchState>, GovernanceError> {
        self.killswitch.state()
    }

    /// 수집/판단 계층에 전달할 킬 스위치 조회 클로저
    pub fn probe(&self) -> KillswitchProbe {
        self.killswitch.probe()
    }

    /// 승인 요청을 생성합니다.
    pub fn request_approval(
        &self,
        requester: &str,
        action: &str,
        reason: &str,
    ) -> Result<ApprovalRequest, GovernanceError> {
        let request = self.approvals.request(requester, action, reason)?;
        self.audit.log_event(
            requester,
            "approval.request",
            format!("request {} ({action})", request.id),
            "ok",
        )?;
        Ok(request)
    }

    /// 승인 요청을 승인합니다.
    pub fn approve(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        let resolved = self.approvals.approve(request_id, reviewer, notes)?;
        self.audit.log_event(
            reviewer,
            "approval.approve",
            format!("request {request_id}"),
            "ok",
        )?;
        Ok(resolved)
    }

    /// 승인 요청을 거부합니다.
    pub fn reject(
        &self,
        request_id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        let resolved = self.approvals.reject(request_id, reviewer, notes)?;
        self.audit.log_event(
            reviewer,
            "approval.reject",
            format!("request {request_id}"),
            "ok",
        )?;
        Ok(resolved)
    }

    /// 승인 요청 목록 (만료 평가 포함)
    pub fn approval_requests(&self) -> Result<Vec<ApprovalRequest>, GovernanceError> {
        self.approvals.list()
    }

    /// 승인된 요청을 근거로 오버라이드를 적용합니다.
    ///
    /// 성공 시 정확히 한 건의 감사 이벤트를 남깁니다. 승인되지 않은
    /// 요청으로 인한 거부도 감사에 남습니다.
    pub fn apply_override(
        &self,
        request_id: &str,
        action: OverrideAction,
        applied_by: &str,
    ) -> Result<AppliedOverride, GovernanceError> {
        match self
            .overrides
            .apply(&self.approvals, request_id, action.clone(), applied_by)
        {
            Ok(applied) => {
                self.audit.log_event(
                    applied_by,
                    "override.apply",
                    format!("override {} ({})", applied.override_id, applied.action),
                    "ok",
                )?;
                Ok(applied)
            }
            Err(err @ GovernanceError::NotApproved { .. }) => {
                self.audit.log_event(
                    applied_by,
                    "override.apply",
                    format!("request {request_id} ({action})"),
                    "refused",
                )?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// 적용된 오버라이드를 롤백하고 원본을 참조하는 보상 감사
    /// 이벤트를 남깁니다.
    pub fn rollback_override(
        &self,
        override_id: &str,
        actor: &str,
    ) -> Result<AppliedOverride, GovernanceError> {
        let rolled = self.rollback.rollback(override_id)?;
        self.audit.log_event(
            actor,
            "override.rollback",
            format!("override {} ({})", rolled.override_id, rolled.action),
            "ok",
        )?;
        Ok(rolled)
    }

    /// 오버라이드 이력
    pub fn overrides(&self) -> Result<Vec<AppliedOverride>, GovernanceError> {
        self.overrides.list()
    }

    /// 현재 억제 중인 위협 범주
    pub fn active_suppressions(&self) -> Result<Vec<ThreatCategory>, GovernanceError> {
        self.overrides.active_suppressions()
    }

    /// 감사 이벤트 조회
    pub fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, GovernanceError> {
        self.audit.events(filter)
    }
}
