//! 수집 엔진 설정
//!
//! core의 `[ingest]` 섹션에서 파생되는 확장 설정입니다.
//! 폴링 주기, 드레인 주기 등 수집 엔진 내부 동작 파라미터를 담습니다.

use crate::error::IngestError;

/// 수집 엔진 설정
#[derive(Debug, Clone)]
pub struct IngestionConfig {
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
    /// 소스 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 드레인 태스크 체크 주기 (밀리초)
    pub drain_tick_ms: u64,
    /// 사라진 파일의 테일러를 정리하기까지의 유예 시간 (초)
    pub grace_period_secs: u64,
    /// stop 시 태스크 종료 대기 한도 (초)
    pub stop_timeout_secs: u64,
    /// 설정된 파일을 처음부터 읽을지 여부 (기본은 끝에서부터 테일링)
    pub read_from_start: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_types: vec!["auth".to_owned(), "network".to_owned()],
            file_paths: vec![],
            directories: vec![],
            file_pattern: "*.log".to_owned(),
            max_batch_size: 100,
            batch_interval_secs: 5.0,
            enforce_killswitch: true,
            poll_interval_ms: 1000,
            drain_tick_ms: 500,
            grace_period_secs: 30,
            stop_timeout_secs: 5,
            read_from_start: false,
        }
    }
}

impl IngestionConfig {
    /// core의 `IngestConfig`에서 수집 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &soctide_core::config::IngestConfig) -> Self {
        Self {
            enabled: core.enabled,
            log_types: core.log_types.clone(),
            file_paths: core.file_paths.clone(),
            directories: core.directories.clone(),
            file_pattern: core.file_pattern.clone(),
            max_batch_size: core.max_batch_size,
            batch_interval_secs: core.batch_interval_secs,
            enforce_killswitch: core.enforce_killswitch,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_batch_size == 0 {
            return Err(IngestError::Config {
                field: "max_batch_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.batch_interval_secs <= 0.0 {
            return Err(IngestError::Config {
                field: "batch_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(IngestError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.drain_tick_ms == 0 {
            return Err(IngestError::Config {
                field: "drain_tick_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.file_pattern.is_empty() && !self.directories.is_empty() {
            return Err(IngestError::Config {
                field: "file_pattern".to_owned(),
                reason: "must not be empty when directories are configured".to_owned(),
            });
        }
        Ok(())
    }
}

/// 수집 설정 빌더
///
/// 3개 이상의 설정 필드가 있으므로 빌더 패턴을 사용합니다.
#[derive(Default)]
pub struct IngestionConfigBuilder {
    config: IngestionConfig,
}

impl IngestionConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: IngestionConfig::default(),
        }
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 테일링 대상 파일 경로를 설정합니다.
    pub fn file_paths(mut self, paths: Vec<String>) -> Self {
        self.config.file_paths = paths;
        self
    }

    /// 감시 대상 디렉토리를 설정합니다.
    pub fn directories(mut self, dirs: Vec<String>) -> Self {
        self.config.directories = dirs;
        self
    }

    /// 디렉토리 감시 파일명 패턴을 설정합니다.
    pub fn file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.file_pattern = pattern.into();
        self
    }

    /// 배치 최대 크기를 설정합니다.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    /// 배치 플러시 간격을 설정합니다 (초).
    pub fn batch_interval_secs(mut self, secs: f64) -> Self {
        self.config.batch_interval_secs = secs;
        self
    }

    /// 킬 스위치 적용 여부를 설정합니다.
    pub fn enforce_killswitch(mut self, enforce: bool) -> Self {
        self.config.enforce_killswitch = enforce;
        self
    }

    /// 소스 폴링 주기를 설정합니다 (밀리초).
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 드레인 체크 주기를 설정합니다 (밀리초).
    pub fn drain_tick_ms(mut self, ms: u64) -> Self {
        self.config.drain_tick_ms = ms;
        self
    }

    /// 설정된 파일을 처음부터 읽을지 설정합니다.
    pub fn read_from_start(mut self, from_start: bool) -> Self {
        self.config.read_from_start = from_start;
        self
    }

    /// 설정을 빌드하고 유효성을 검증합니다.
    pub fn build(self) -> Result<IngestionConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
