//! 판단 계층 에러 타입

use soctide_core::error::{ConfigError, PipelineError, SoctideError};

/// 판단 계층 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// 스코어러가 하나도 등록되지 않음
    #[error("no scorers registered")]
    NoScorers,

    /// 설정 값이 유효하지 않음
    #[error("invalid config '{field}': {reason}")]
    Config {
        /// 문제가 된 설정 필드
        field: String,
        /// 거부 사유
        reason: String,
    },

    /// 이미 실행 중인 파이프라인을 다시 시작함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 중지함
    #[error("pipeline not running")]
    NotRunning,
}

impl From<AnalysisError> for SoctideError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NoScorers => SoctideError::Pipeline(PipelineError::InitFailed(
                "no scorers registered".to_owned(),
            )),
            AnalysisError::Config { field, reason } => {
                SoctideError::Config(ConfigError::InvalidValue { field, reason })
            }
            AnalysisError::AlreadyRunning => SoctideError::Pipeline(PipelineError::AlreadyRunning),
            AnalysisError::NotRunning => SoctideError::Pipeline(PipelineError::NotRunning),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts() {
        let err = AnalysisError::Config {
            field: "anomaly_weight".to_owned(),
            reason: "must be within 0.0..=1.0".to_owned(),
        };
        let soctide_err: SoctideError = err.into();
        assert!(matches!(soctide_err, SoctideError::Config(_)));
    }

    #[test]
    fn lifecycle_errors_convert() {
        let err: SoctideError = AnalysisError::AlreadyRunning.into();
        assert!(matches!(
            err,
            SoctideError::Pipeline(PipelineError::AlreadyRunning)
        ));
    }
}
