//! Soctide 공통 크레이트
//!
//! 수집 엔진, 거버넌스 계층, 판단 계층이 공유하는 타입과 trait,
//! 에러, 설정을 정의합니다. 모듈 간 결합은 이 크레이트의 타입과
//! [`pipeline`] trait 시임을 통해서만 이루어집니다.

pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, PipelineError, ScorerError, SoctideError, StoreError};

// 설정
pub use config::SoctideConfig;

// 이벤트
pub use event::{AlertEvent, Event, EventMetadata};

// 파이프라인 trait
pub use pipeline::{BatchProcessor, BatchReport, HealthStatus, KillswitchProbe, Pipeline, Scorer};

// 도메인 타입
pub use types::{
    Alert, AlertPriority, AlertStatus, Batch, BufferStats, EnsembleResult, ModelVerdict,
    ParsedRecord, RiskLevel, ThreatCategory,
};
