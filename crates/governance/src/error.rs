//! 거버넌스 계층 에러 타입
//!
//! [`GovernanceError`]는 거버넌스 스토어와 워크플로에서 발생하는 모든
//! 에러를 표현합니다. `From<GovernanceError> for SoctideError` 변환이
//! 구현되어 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 스토어 손상([`GovernanceError::Corrupt`])은 치명적 에러입니다.
//! 조용히 복구하거나 기본값으로 대체하지 않습니다.

use soctide_core::error::{SoctideError, StoreError};

/// 거버넌스 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// 스토어 파일에 접근할 수 없음
    #[error("store unavailable: {path}: {reason}")]
    Unavailable {
        /// 스토어 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 스토어 내용이 손상됨 — 치명적, 복구 불가
    #[error("store corrupt: {path}: {reason}")]
    Corrupt {
        /// 스토어 파일 경로
        path: String,
        /// 손상 사유
        reason: String,
    },

    /// 존재하지 않는 레코드를 참조함
    #[error("record not found: {id}")]
    NotFound {
        /// 참조한 레코드 ID
        id: String,
    },

    /// 허용되지 않는 상태 전이
    #[error("invalid transition for '{id}': {reason}")]
    InvalidTransition {
        /// 대상 레코드 ID
        id: String,
        /// 거부 사유
        reason: String,
    },

    /// 승인되지 않은 요청으로 오버라이드를 시도함
    #[error("request '{id}' is not approved: {state}")]
    NotApproved {
        /// 승인 요청 ID
        id: String,
        /// 현재 상태
        state: String,
    },
}

impl From<GovernanceError> for SoctideError {
    fn from(err: GovernanceError) -> Self {
        let store_err = match err {
            GovernanceError::Unavailable { path, reason } => {
                StoreError::Unavailable { path, reason }
            }
            GovernanceError::Corrupt { path, reason } => StoreError::Corrupt { path, reason },
            GovernanceError::NotFound { id } => StoreError::NotFound { id },
            GovernanceError::InvalidTransition { id, reason } => {
                StoreError::InvalidTransition { id, reason }
            }
            GovernanceError::NotApproved { id, state } => StoreError::InvalidTransition {
                id,
                reason: format!("not approved (state: {state})"),
            },
        };
        SoctideError::Store(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_error_display() {
        let err = GovernanceError::Corrupt {
            path: "/var/lib/soctide/audit.log".to_owned(),
            reason: "invalid json at line 3".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit.log"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn converts_to_store_error() {
        let err = GovernanceError::NotFound {
            id: "req-123".to_owned(),
        };
        let soctide_err: SoctideError = err.into();
        assert!(matches!(
            soctide_err,
            SoctideError::Store(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn not_approved_maps_to_invalid_transition() {
        let err = GovernanceError::NotApproved {
            id: "req-1".to_owned(),
            state: "Rejected".to_owned(),
        };
        let soctide_err: SoctideError = err.into();
        assert!(matches!(
            soctide_err,
            SoctideError::Store(StoreError::InvalidTransition { .. })
        ));
    }
}
