//! 파이프라인 trait — 모듈 확장 포인트 정의

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SoctideError;
use crate::types::{Alert, Batch, ModelVerdict, ParsedRecord};

/// 모듈 상태
///
/// 각 모듈이 `health_check()`로 보고하는 상태입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이나 성능 저하 (사유 포함)
    Degraded(String),
    /// 동작 불가 (사유 포함)
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 모듈 생명주기 trait
///
/// 수집 엔진과 판단 파이프라인이 구현합니다. 데몬 오케스트레이터가
/// start/stop 순서를 제어합니다.
pub trait Pipeline {
    /// 파이프라인을 시작합니다. 이미 실행 중이면 에러를 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), SoctideError>> + Send;

    /// 파이프라인을 중지하고 백그라운드 태스크를 정리합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), SoctideError>> + Send;

    /// 현재 상태를 보고합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 스코어러 trait — 외부 판단 모델의 연결 지점
///
/// 분류 모델과 이상 탐지 모델 모두 이 trait으로 연결됩니다.
/// 판단 파이프라인은 스코어러 내부를 알지 못하며 [`ModelVerdict`]만
/// 소비합니다.
pub trait Scorer: Send + Sync {
    /// 스코어러 이름 (결과 추적에 사용)
    fn name(&self) -> &str;

    /// 레코드 하나를 평가합니다.
    fn score(&self, record: &ParsedRecord) -> Result<ModelVerdict, SoctideError>;
}

/// 배치 처리 결과 보고서
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// 처리한 배치 ID
    pub batch_id: String,
    /// 처리된 레코드 수
    pub processed: usize,
    /// 억제된 알림 수
    pub suppressed: usize,
    /// 레코드 단위 처리 실패 수
    pub errors: usize,
    /// 생성된 알림
    pub alerts: Vec<Alert>,
}

/// 배치 소비자 trait — 수집 엔진의 다운스트림 연결 지점
///
/// `Ok(None)`은 킬 스위치에 의해 배치가 건너뛰어졌음을 의미하며
/// 에러가 아닙니다.
pub trait BatchProcessor: Send {
    /// 배치 하나를 처리합니다.
    fn process_batch(&mut self, batch: Batch) -> Result<Option<BatchReport>, SoctideError>;
}

/// 킬 스위치 상태 조회 클로저
///
/// 수집 엔진과 판단 파이프라인은 거버넌스 크레이트에 직접 의존하지 않고
/// 이 클로저로 킬 스위치 상태만 조회합니다.
pub type KillswitchProbe = Arc<dyn Fn() -> bool + Send + Sync>;
