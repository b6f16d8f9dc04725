//! Soctide 수집 엔진
//!
//! 로그 파일을 테일링하고 디렉토리를 감시하여 레코드를 마이크로 배치로
//! 묶어 다운스트림 배치 소비자에게 전달합니다.
//!
//! # 구성 요소
//! - [`FileTailer`]: 단일 파일의 증분 읽기 커서
//! - [`DirectoryWatcher`]: 패턴 기반 디렉토리 감시
//! - [`MicroBatchBuffer`]: 크기/시간 조건 기반 배치 버퍼
//! - [`IngestionController`]: 소스와 태스크의 생명주기 관리

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod tailer;
pub mod watcher;

pub use buffer::MicroBatchBuffer;
pub use config::{IngestionConfig, IngestionConfigBuilder};
pub use controller::{
    IngestionController, IngestionControllerBuilder, IngestionStatus, SourceKind, SourceStatus,
};
pub use error::IngestError;
pub use tailer::FileTailer;
pub use watcher::{DirectoryWatcher, WatcherStats, wildcard_match};
