//! Soctide 판단 계층
//!
//! 수집 엔진에서 넘어온 배치를 스코어러 앙상블로 평가하고 알림을
//! 생성합니다:
//!
//! - **앙상블 융합**: 스코어러 출력을 하나의 판단으로 결합 ([`ensemble`])
//! - **중복 제거**: 저위험 이벤트의 지문 기반 쿨다운 ([`dedup`])
//! - **알림 생성**: 융합 결과를 [`soctide_core::types::Alert`]로 변환 ([`alert`])
//! - **파이프라인**: 배치 소비, 킬 스위치 준수, 통계 ([`pipeline`])
//!
//! 스코어러 내부는 이 크레이트의 범위 밖입니다. 모든 모델은
//! [`soctide_core::pipeline::Scorer`] seam으로 연결됩니다.

pub mod alert;
pub mod config;
pub mod dedup;
pub mod ensemble;
pub mod error;
pub mod pipeline;

pub use alert::{mitre_techniques, AlertGenerator};
pub use config::{category_severity, default_severity_floor, AnalysisConfig};
pub use dedup::{fingerprint_event, EventDeduplicator, Fingerprint};
pub use ensemble::EnsembleCoordinator;
pub use error::AnalysisError;
pub use pipeline::{
    AnalysisPipeline, AnalysisPipelineBuilder, AnalysisStats, SuppressionProbe,
};
