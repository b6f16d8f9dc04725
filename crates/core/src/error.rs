//! 에러 타입 — 도메인별 에러 정의

/// Soctide 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SoctideError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 거버넌스 스토어 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// 스코어러 실행 에러
    #[error("scorer error: {0}")]
    Scorer(#[from] ScorerError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중인 파이프라인을 다시 시작하려 함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 중지하려 함
    #[error("pipeline not running")]
    NotRunning,
}

/// 거버넌스 스토어 에러
///
/// 거버넌스 상태 파일(킬 스위치, 감사 로그, 승인/오버라이드 스토어)의
/// 접근 실패를 나타냅니다. `Corrupt`는 치명적 에러로, 복구하지 않고
/// 전파되어야 합니다.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 스토어 파일에 접근할 수 없음
    #[error("store unavailable: {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// 스토어 내용이 손상됨 — 치명적, 복구 불가
    #[error("store corrupt: {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// 존재하지 않는 레코드를 참조함
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// 허용되지 않는 상태 전이
    #[error("invalid transition for '{id}': {reason}")]
    InvalidTransition { id: String, reason: String },
}

/// 스코어러 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    /// 스코어러가 입력을 처리할 수 없음
    #[error("scorer '{scorer}' failed: {reason}")]
    Failed { scorer: String, reason: String },

    /// 스코어러 출력이 유효 범위를 벗어남
    #[error("scorer '{scorer}' produced invalid output: {reason}")]
    InvalidOutput { scorer: String, reason: String },
}
