//! 수집 엔진 에러 타입
//!
//! [`IngestError`]는 수집 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<IngestError> for SoctideError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use soctide_core::error::{PipelineError, SoctideError};

/// 수집 엔진 도메인 에러
///
/// 테일링, 디렉토리 감시, 버퍼링, 컨트롤러 생명주기 등 수집 엔진
/// 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 소스 파일 접근 실패
    #[error("source error: {path}: {reason}")]
    Source {
        /// 소스 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 디렉토리 감시 실패
    #[error("watch error: {dir}: {reason}")]
    Watch {
        /// 감시 대상 디렉토리
        dir: String,
        /// 에러 사유
        reason: String,
    },

    /// 중복된 소스 ID 등록
    #[error("duplicate source id: {0}")]
    DuplicateSource(String),

    /// 컨트롤러가 이미 실행 중
    #[error("controller already running")]
    AlreadyRunning,

    /// 컨트롤러가 실행 중이 아님
    #[error("controller not running")]
    NotRunning,

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 다운스트림 배치 처리 실패
    #[error("processor error: {0}")]
    Processor(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IngestError> for SoctideError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::AlreadyRunning => SoctideError::Pipeline(PipelineError::AlreadyRunning),
            IngestError::NotRunning => SoctideError::Pipeline(PipelineError::NotRunning),
            other => SoctideError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
