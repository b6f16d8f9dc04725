//! Soctide 거버넌스 계층
//!
//! 운영자가 탐지 파이프라인을 통제하는 수단을 제공합니다:
//!
//! - **킬 스위치**: 마커 파일 기반 긴급 정지 ([`killswitch`])
//! - **감사 로그**: 추가 전용 JSON 라인 기록 ([`audit`])
//! - **승인 워크플로**: 민감한 조치의 사전 승인 ([`approval`])
//! - **오버라이드**: 승인 기반 분석 동작 변경과 롤백 ([`overrides`])
//!
//! 모든 상태는 단일 스토어 디렉토리 아래 파일로 영속되며, 같은
//! 디렉토리를 보는 모든 프로세스 인스턴스에 즉시 보입니다.
//! [`GovernanceHub`]가 단일 진입점이며 상태 변화마다 정확히 한 건의
//! 감사 이벤트를 남깁니다.

pub mod approval;
pub mod audit;
pub mod error;
pub mod hub;
pub mod killswitch;
pub mod overrides;

mod store;

pub use approval::{ApprovalRequest, ApprovalState, ApprovalWorkflow, APPROVALS_FILE};
pub use audit::{AuditEvent, AuditFilter, AuditLogger, AUDIT_FILE};
pub use error::GovernanceError;
pub use hub::GovernanceHub;
pub use killswitch::{KillSwitch, KillSwitchState, KILLSWITCH_FILE};
pub use overrides::{
    AppliedOverride, OverrideAction, OverrideManager, RollbackManager, OVERRIDES_FILE,
};
