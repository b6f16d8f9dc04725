//! 오버라이드 적용과 롤백
//!
//! 승인된 요청에 한해 분석 동작을 바꾸는 오버라이드를 적용합니다.
//! 적용 이력은 `overrides.json`에 남으며, 롤백은 이력을 지우지 않고
//! `rolled_back` 플래그만 뒤집습니다. 감사 기록은 허브가 담당하고
//! 여기서는 상태 영속만 책임집니다.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soctide_core::types::ThreatCategory;

use crate::approval::{ApprovalState, ApprovalWorkflow};
use crate::error::GovernanceError;
use crate::store::{read_json, write_json_atomic};

/// 오버라이드 스토어 파일명
pub const OVERRIDES_FILE: &str = "overrides.json";

/// 적용 가능한 오버라이드 조치
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideAction {
    /// 특정 위협 범주의 알림을 억제
    SuppressCategory {
        /// 억제할 범주
        category: ThreatCategory,
    },
    /// 억제 중인 범주를 해제
    ReleaseCategory {
        /// 해제할 범주
        category: ThreatCategory,
    },
    /// 중복 제거 상태를 초기화하여 재분석을 강제
    ForceReanalysis,
}

impl std::fmt::Display for OverrideAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideAction::SuppressCategory { category } => {
                write!(f, "suppress_category({category:?})")
            }
            OverrideAction::ReleaseCategory { category } => {
                write!(f, "release_category({category:?})")
            }
            OverrideAction::ForceReanalysis => write!(f, "force_reanalysis"),
        }
    }
}

/// 적용된 오버라이드 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedOverride {
    /// 오버라이드 ID (UUID v4)
    pub override_id: String,
    /// 근거가 된 승인 요청 ID
    pub request_id: String,
    /// 적용한 조치
    pub action: OverrideAction,
    /// 적용 주체
    pub applied_by: String,
    /// 적용 시각
    pub applied_at: DateTime<Utc>,
    /// 롤백 여부
    pub rolled_back: bool,
    /// 롤백 시각
    pub rolled_back_at: Option<DateTime<Utc>>,
}

/// 승인 기반 오버라이드 관리자
pub struct OverrideManager {
    /// 스토어 파일 경로
    path: PathBuf,
}

impl OverrideManager {
    /// 스토어 디렉토리 기준으로 관리자를 생성합니다.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            path: store_dir.as_ref().join(OVERRIDES_FILE),
        }
    }

    /// 승인된 요청을 근거로 오버라이드를 적용합니다.
    ///
    /// 요청이 Approved 상태가 아니면 거부합니다. Expired와 Rejected는
    /// 동일하게 거부 사유가 됩니다.
    pub fn apply(
        &self,
        approvals: &ApprovalWorkflow,
        request_id: &str,
        action: OverrideAction,
        applied_by: impl Into<String>,
    ) -> Result<AppliedOverride, GovernanceError> {
        let request = approvals.get(request_id)?;
        if request.state != ApprovalState::Approved {
            return Err(GovernanceError::NotApproved {
                id: request_id.to_owned(),
                state: request.state.to_string(),
            });
        }

        let applied = AppliedOverride {
            override_id: uuid::Uuid::new_v4().to_string(),
            request_id: request_id.to_owned(),
            action,
            applied_by: applied_by.into(),
            applied_at: Utc::now(),
            rolled_back: false,
            rolled_back_at: None,
        };

        let mut overrides = self.load()?;
        overrides.push(applied.clone());
        self.save(&overrides)?;
        tracing::info!(
            override_id = applied.override_id.as_str(),
            action = %applied.action,
            "override applied"
        );
        Ok(applied)
    }

    /// 오버라이드 한 건을 조회합니다.
    pub fn get(&self, override_id: &str) -> Result<AppliedOverride, GovernanceError> {
        self.load()?
            .into_iter()
            .find(|o| o.override_id == override_id)
            .ok_or_else(|| GovernanceError::NotFound {
                id: override_id.to_owned(),
            })
    }

    /// 전체 오버라이드 이력을 조회합니다.
    pub fn list(&self) -> Result<Vec<AppliedOverride>, GovernanceError> {
        self.load()
    }

    /// 현재 억제 중인 위협 범주 목록을 계산합니다.
    ///
    /// 롤백되지 않은 Suppress에서 시작해, 이후의 Release로 상쇄합니다.
    pub fn active_suppressions(&self) -> Result<Vec<ThreatCategory>, GovernanceError> {
        let mut active: Vec<ThreatCategory> = Vec::new();
        for entry in self.load()? {
            if entry.rolled_back {
                continue;
            }
            match entry.action {
                OverrideAction::SuppressCategory { category } => {
                    if !active.contains(&category) {
                        active.push(category);
                    }
                }
                OverrideAction::ReleaseCategory { category } => {
                    active.retain(|c| *c != category);
                }
                OverrideAction::ForceReanalysis => {}
            }
        }
        Ok(active)
    }

    fn load(&self) -> Result<Vec<AppliedOverride>, GovernanceError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&self, overrides: &[AppliedOverride]) -> Result<(), GovernanceError> {
        write_json_atomic(&self.path, &overrides)
    }
}

/// 오버라이드 롤백 관리자
///
/// [`OverrideManager`]와 같은 스토어 파일을 공유합니다.
pub struct RollbackManager {
    /// 스토어 파일 경로
    path: PathBuf,
}

impl RollbackManager {
    /// 스토어 디렉토리 기준으로 관리자를 생성합니다.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            path: store_dir.as_ref().join(OVERRIDES_FILE),
        }
    }

    /// 적용된 오버라이드를 롤백합니다.
    ///
    /// 이력을 삭제하지 않고 `rolled_back` 플래그만 설정합니다.
    /// 이미 롤백된 오버라이드는 다시 롤백할 수 없습니다.
    pub fn rollback(&self, override_id: &str) -> Result<AppliedOverride, GovernanceError> {
        let mut overrides: Vec<AppliedOverride> = read_json(&self.path)?.unwrap_or_default();
        let entry = overrides
            .iter_mut()
            .find(|o| o.override_id == override_id)
            .ok_or_else(|| GovernanceError::NotFound {
                id: override_id.to_owned(),
            })?;

        if entry.rolled_back {
            return Err(GovernanceError::InvalidTransition {
                id: override_id.to_owned(),
                reason: "already rolled back".to_owned(),
            });
        }

        entry.rolled_back = true;
        entry.rolled_back_at = Some(Utc::now());
        let rolled = entry.clone();
        write_json_atomic(&self.path, &overrides)?;
        tracing::info!(
            override_id = override_id,
            action = %rolled.action,
            "override rolled back"
        );
        Ok(rolled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn setup(dir: &tempfile::TempDir) -> (ApprovalWorkflow, OverrideManager, RollbackManager) {
        (
            ApprovalWorkflow::new(dir.path(), Duration::from_secs(3600)),
            OverrideManager::new(dir.path()),
            RollbackManager::new(dir.path()),
        )
    }

    fn approved_request(wf: &ApprovalWorkflow) -> String {
        let req = wf.request("alice", "suppress DDoS", "noisy").unwrap();
        wf.approve(&req.id, "bob", None).unwrap();
        req.id
    }

    #[test]
    fn apply_requires_approved_request() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, _) = setup(&dir);
        let req = wf.request("alice", "x", "y").unwrap();

        // Pending은 거부
        let result = mgr.apply(
            &wf,
            &req.id,
            OverrideAction::ForceReanalysis,
            "alice",
        );
        assert!(matches!(result, Err(GovernanceError::NotApproved { .. })));
    }

    #[test]
    fn rejected_request_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, _) = setup(&dir);
        let req = wf.request("alice", "x", "y").unwrap();
        wf.reject(&req.id, "bob", None).unwrap();

        let result = mgr.apply(&wf, &req.id, OverrideAction::ForceReanalysis, "alice");
        assert!(matches!(result, Err(GovernanceError::NotApproved { .. })));
    }

    #[test]
    fn expired_request_is_refused_like_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let wf = ApprovalWorkflow::new(dir.path(), Duration::ZERO);
        let mgr = OverrideManager::new(dir.path());
        let req = wf.request("alice", "x", "y").unwrap();

        let result = mgr.apply(&wf, &req.id, OverrideAction::ForceReanalysis, "alice");
        assert!(matches!(
            result,
            Err(GovernanceError::NotApproved { ref state, .. }) if state == "Expired"
        ));
    }

    #[test]
    fn approved_request_applies() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, _) = setup(&dir);
        let request_id = approved_request(&wf);

        let applied = mgr
            .apply(
                &wf,
                &request_id,
                OverrideAction::SuppressCategory {
                    category: ThreatCategory::DDoS,
                },
                "alice",
            )
            .unwrap();
        assert!(!applied.rolled_back);
        assert_eq!(applied.request_id, request_id);
        assert_eq!(
            mgr.active_suppressions().unwrap(),
            vec![ThreatCategory::DDoS]
        );
    }

    #[test]
    fn release_cancels_suppression() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, _) = setup(&dir);
        let request_id = approved_request(&wf);

        mgr.apply(
            &wf,
            &request_id,
            OverrideAction::SuppressCategory {
                category: ThreatCategory::BruteForce,
            },
            "alice",
        )
        .unwrap();
        mgr.apply(
            &wf,
            &request_id,
            OverrideAction::ReleaseCategory {
                category: ThreatCategory::BruteForce,
            },
            "alice",
        )
        .unwrap();
        assert!(mgr.active_suppressions().unwrap().is_empty());
    }

    #[test]
    fn rollback_clears_suppression_but_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, rb) = setup(&dir);
        let request_id = approved_request(&wf);

        let applied = mgr
            .apply(
                &wf,
                &request_id,
                OverrideAction::SuppressCategory {
                    category: ThreatCategory::Malware,
                },
                "alice",
            )
            .unwrap();
        let rolled = rb.rollback(&applied.override_id).unwrap();
        assert!(rolled.rolled_back);
        assert!(rolled.rolled_back_at.is_some());

        assert!(mgr.active_suppressions().unwrap().is_empty());
        // 이력은 남아 있음
        assert_eq!(mgr.list().unwrap().len(), 1);
    }

    #[test]
    fn double_rollback_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (wf, mgr, rb) = setup(&dir);
        let request_id = approved_request(&wf);
        let applied = mgr
            .apply(&wf, &request_id, OverrideAction::ForceReanalysis, "alice")
            .unwrap();

        rb.rollback(&applied.override_id).unwrap();
        assert!(matches!(
            rb.rollback(&applied.override_id),
            Err(GovernanceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rollback_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, rb) = setup(&dir);
        assert!(matches!(
            rb.rollback("missing"),
            Err(GovernanceError::NotFound { .. })
        ));
    }
}
