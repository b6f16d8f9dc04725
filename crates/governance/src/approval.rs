//! 승인 워크플로 — 민감한 조치의 사전 승인
//!
//! 오버라이드 같은 민감한 조치는 먼저 승인 요청을 만들고, 검토자가
//! 승인한 뒤에만 적용할 수 있습니다. 요청은 `approvals.json`에
//! 보관됩니다.
//!
//! 타임아웃 만료는 백그라운드 태스크 없이 지연 평가합니다. 스토어를
//! 읽을 때마다 제한 시간을 넘긴 Pending 요청을 Expired로 전환한 뒤
//! 결과를 되돌려줍니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::store::{read_json, write_json_atomic};

/// 승인 스토어 파일명
pub const APPROVALS_FILE: &str = "approvals.json";

/// 승인 요청 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalState {
    /// 검토 대기 중
    Pending,
    /// 승인됨
    Approved,
    /// 거부됨
    Rejected,
    /// 제한 시간 초과
    Expired,
}

impl ApprovalState {
    /// 종결 상태 여부 (종결 상태에서는 더 이상 전이할 수 없음)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalState::Pending)
    }
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApprovalState::Pending => "Pending",
            ApprovalState::Approved => "Approved",
            ApprovalState::Rejected => "Rejected",
            ApprovalState::Expired => "Expired",
        };
        write!(f, "{s}")
    }
}

/// 승인 요청 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// 요청 ID (UUID v4)
    pub id: String,
    /// 요청 주체
    pub requester: String,
    /// 요청한 조치 설명
    pub action: String,
    /// 요청 사유
    pub reason: String,
    /// 현재 상태
    pub state: ApprovalState,
    /// 요청 시각
    pub requested_at: DateTime<Utc>,
    /// 종결 시각 (승인/거부/만료)
    pub resolved_at: Option<DateTime<Utc>>,
    /// 검토자 (승인/거부 시)
    pub reviewer: Option<String>,
    /// 검토 메모
    pub notes: Option<String>,
}

/// 승인 워크플로
pub struct ApprovalWorkflow {
    /// 스토어 파일 경로
    path: PathBuf,
    /// Pending 요청 제한 시간
    timeout: Duration,
}

impl ApprovalWorkflow {
    /// 스토어 디렉토리와 제한 시간으로 워크플로를 생성합니다.
    pub fn new(store_dir: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            path: store_dir.as_ref().join(APPROVALS_FILE),
            timeout,
        }
    }

    /// 새 승인 요청을 생성합니다. Pending 상태로 시작합니다.
    pub fn request(
        &self,
        requester: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        let mut requests = self.load()?;
        let request = ApprovalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            requester: requester.into(),
            action: action.into(),
            reason: reason.into(),
            state: ApprovalState::Pending,
            requested_at: Utc::now(),
            resolved_at: None,
            reviewer: None,
            notes: None,
        };
        requests.push(request.clone());
        self.save(&requests)?;
        tracing::info!(
            request_id = request.id.as_str(),
            action = request.action.as_str(),
            "approval requested"
        );
        Ok(request)
    }

    /// Pending 요청을 승인합니다.
    pub fn approve(
        &self,
        id: &str,
        reviewer: impl Into<String>,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        self.resolve(id, ApprovalState::Approved, reviewer.into(), notes)
    }

    /// Pending 요청을 거부합니다.
    pub fn reject(
        &self,
        id: &str,
        reviewer: impl Into<String>,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        self.resolve(id, ApprovalState::Rejected, reviewer.into(), notes)
    }

    /// 요청 한 건을 조회합니다. 만료 평가를 거친 결과입니다.
    pub fn get(&self, id: &str) -> Result<ApprovalRequest, GovernanceError> {
        self.load()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| GovernanceError::NotFound { id: id.to_owned() })
    }

    /// 모든 요청을 조회합니다. 만료 평가를 거친 결과입니다.
    pub fn list(&self) -> Result<Vec<ApprovalRequest>, GovernanceError> {
        self.load()
    }

    fn resolve(
        &self,
        id: &str,
        target: ApprovalState,
        reviewer: String,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, GovernanceError> {
        let mut requests = self.load()?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GovernanceError::NotFound { id: id.to_owned() })?;

        if request.state.is_terminal() {
            return Err(GovernanceError::InvalidTransition {
                id: id.to_owned(),
                reason: format!("already {} (terminal)", request.state),
            });
        }

        request.state = target;
        request.resolved_at = Some(Utc::now());
        request.reviewer = Some(reviewer);
        request.notes = notes;
        let resolved = request.clone();
        self.save(&requests)?;
        tracing::info!(
            request_id = id,
            state = %resolved.state,
            "approval request resolved"
        );
        Ok(resolved)
    }

    /// 스토어를 읽고 만료된 Pending 요청을 Expired로 전환합니다.
    ///
    /// 전환이 발생했으면 변경분을 바로 디스크에 반영합니다.
    fn load(&self) -> Result<Vec<ApprovalRequest>, GovernanceError> {
        let mut requests: Vec<ApprovalRequest> = read_json(&self.path)?.unwrap_or_default();

        let now = Utc::now();
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX);
        let mut expired = 0usize;
        for request in &mut requests {
            if request.state == ApprovalState::Pending && now - request.requested_at >= timeout {
                request.state = ApprovalState::Expired;
                request.resolved_at = Some(now);
                expired += 1;
            }
        }
        if expired > 0 {
            self.save(&requests)?;
            tracing::info!(count = expired, "pending approval requests expired");
        }
        Ok(requests)
    }

    fn save(&self, requests: &[ApprovalRequest]) -> Result<(), GovernanceError> {
        write_json_atomic(&self.path, &requests)
    }
}
