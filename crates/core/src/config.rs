//! 설정 관리 — soctide.toml 파싱 및 런타임 설정
//!
//! [`SoctideConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SOCTIDE_INGEST_MAX_BATCH_SIZE=500` 형식)
//! 3. 설정 파일 (`soctide.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), soctide_core::error::SoctideError> {
//! use soctide_core::config::SoctideConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SoctideConfig::load("soctide.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SoctideConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SoctideError};

/// Soctide 통합 설정
///
/// `soctide.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoctideConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 엔진 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 거버넌스 설정
    #[serde(default)]
    pub governance: GovernanceConfig,
    /// 판단 계층 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl SoctideConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SoctideError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SoctideError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SoctideError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SoctideError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SoctideError> {
        toml::from_str(toml_str).map_err(|e| {
            SoctideError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SOCTIDE_{SECTION}_{FIELD}`
    /// 예: `SOCTIDE_GOVERNANCE_STORE_DIR=/var/lib/soctide/governance`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SOCTIDE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SOCTIDE_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "SOCTIDE_GENERAL_DATA_DIR");
        override_string(&mut self.general.pid_file, "SOCTIDE_GENERAL_PID_FILE");

        // Ingest
        override_bool(&mut self.ingest.enabled, "SOCTIDE_INGEST_ENABLED");
        override_csv(&mut self.ingest.log_types, "SOCTIDE_INGEST_LOG_TYPES");
        override_csv(&mut self.ingest.file_paths, "SOCTIDE_INGEST_FILE_PATHS");
        override_csv(&mut self.ingest.directories, "SOCTIDE_INGEST_DIRECTORIES");
        override_string(&mut self.ingest.file_pattern, "SOCTIDE_INGEST_FILE_PATTERN");
        override_usize(
            &mut self.ingest.max_batch_size,
            "SOCTIDE_INGEST_MAX_BATCH_SIZE",
        );
        override_f64(
            &mut self.ingest.batch_interval_secs,
            "SOCTIDE_INGEST_BATCH_INTERVAL_SECS",
        );
        override_bool(
            &mut self.ingest.enforce_killswitch,
            "SOCTIDE_INGEST_ENFORCE_KILLSWITCH",
        );

        // Governance
        override_string(
            &mut self.governance.store_dir,
            "SOCTIDE_GOVERNANCE_STORE_DIR",
        );
        override_u64(
            &mut self.governance.approval_timeout_secs,
            "SOCTIDE_GOVERNANCE_APPROVAL_TIMEOUT_SECS",
        );

        // Analysis
        override_f64(
            &mut self.analysis.anomaly_weight,
            "SOCTIDE_ANALYSIS_ANOMALY_WEIGHT",
        );
        override_f64(
            &mut self.analysis.classification_weight,
            "SOCTIDE_ANALYSIS_CLASSIFICATION_WEIGHT",
        );
        override_u64(
            &mut self.analysis.dedup_window_secs,
            "SOCTIDE_ANALYSIS_DEDUP_WINDOW_SECS",
        );
        override_usize(
            &mut self.analysis.alert_history_capacity,
            "SOCTIDE_ANALYSIS_ALERT_HISTORY_CAPACITY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SoctideError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // ingest 검증
        if self.ingest.enabled {
            if self.ingest.max_batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "ingest.max_batch_size".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
            if self.ingest.batch_interval_secs <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "ingest.batch_interval_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        // governance 검증
        if self.governance.store_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "governance.store_dir".to_owned(),
                reason: "store_dir must not be empty".to_owned(),
            }
            .into());
        }

        // analysis 검증
        for (field, value) in [
            ("analysis.anomaly_weight", self.analysis.anomaly_weight),
            (
                "analysis.classification_weight",
                self.analysis.classification_weight,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be between 0.0 and 1.0".to_owned(),
                }
                .into());
            }
        }
        if self.analysis.anomaly_weight + self.analysis.classification_weight <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis".to_owned(),
                reason: "weights must not both be zero".to_owned(),
            }
            .into());
        }
        if self.analysis.dedup_window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.dedup_window_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리
    pub data_dir: String,
    /// PID 파일 경로
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/soctide".to_owned(),
            pid_file: "/var/run/soctide.pid".to_owned(),
        }
    }
}

/// 수집 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수집 대상 로그 유형 레이블 (상태 보고용)
    pub log_types: Vec<String>,
    /// 개별 테일링 대상 파일 경로
    pub file_paths: Vec<String>,
    /// 감시 대상 디렉토리
    pub directories: Vec<String>,
    /// 디렉토리 감시 파일명 패턴 (`*`, `?` 와일드카드)
    pub file_pattern: String,
    /// 배치 최대 크기 (레코드 수)
    pub max_batch_size: usize,
    /// 배치 플러시 간격 (초, 소수 허용)
    pub batch_interval_secs: f64,
    /// 킬 스위치 적용 여부
    pub enforce_killswitch: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_types: vec!["auth".to_owned(), "network".to_owned()],
            file_paths: vec!["/var/log/auth.log".to_owned()],
            directories: vec![],
            file_pattern: "*.log".to_owned(),
            max_batch_size: 100,
            batch_interval_secs: 5.0,
            enforce_killswitch: true,
        }
    }
}

/// 거버넌스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// 거버넌스 상태 파일 디렉토리 (킬 스위치, 감사 로그, 스토어)
    pub store_dir: String,
    /// 승인 요청 만료 시간 (초)
    pub approval_timeout_secs: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            store_dir: "/var/lib/soctide/governance".to_owned(),
            approval_timeout_secs: 3600,
        }
    }
}

/// 판단 계층 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 이상 점수 가중치
    pub anomaly_weight: f64,
    /// 분류 심각도 가중치
    pub classification_weight: f64,
    /// 중복 제거 쿨다운 윈도우 (초)
    pub dedup_window_secs: u64,
    /// 최근 알림 보관 개수
    pub alert_history_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_weight: 0.4,
            classification_weight: 0.6,
            dedup_window_secs: 300,
            alert_history_capacity: 100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
