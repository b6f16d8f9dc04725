//! 수집 컨트롤러 — 소스, 버퍼, 드레인 태스크의 생명주기 관리
//!
//! [`IngestionController`]는 core의 [`Pipeline`](soctide_core::pipeline::Pipeline)
//! trait을 구현하여 데몬에서 다른 모듈과 동일한 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileTailer / DirectoryWatcher -> (reader tasks) -> MicroBatchBuffer
//!                                       (drain task) -> killswitch gate -> BatchProcessor
//! ```
//!
//! 킬 스위치가 활성화된 상태에서 드레인된 배치는 버려지며 재전송되지
//! 않습니다. 다운스트림 처리 에러는 여기서 격리되어 수집 주기를
//! 중단시키지 않습니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use soctide_core::error::SoctideError;
use soctide_core::pipeline::{BatchProcessor, HealthStatus, KillswitchProbe, Pipeline};
use soctide_core::types::{Batch, BufferStats, ParsedRecord};

use crate::buffer::MicroBatchBuffer;
use crate::config::IngestionConfig;
use crate::error::IngestError;
use crate::tailer::FileTailer;
use crate::watcher::DirectoryWatcher;

/// 컨트롤러 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 소스 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 단일 파일 테일링
    File,
    /// 디렉토리 감시
    Directory,
}

/// 소스별 상태 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    /// 소스 ID
    pub id: String,
    /// 파일 또는 디렉토리 경로
    pub path: String,
    /// 소스 유형
    pub kind: SourceKind,
    /// 마지막 폴링 시점에 접근 가능했는지 여부
    pub available: bool,
    /// 읽기 권한 확인 결과
    pub permission_ok: bool,
    /// 지금까지 읽은 라인 수
    pub lines_read: u64,
}

/// 컨트롤러 상태 보고서
#[derive(Debug, Clone, Serialize)]
pub struct IngestionStatus {
    /// 실행 중 여부
    pub running: bool,
    /// 운영체제 식별자
    pub os_type: String,
    /// 소스별 상태
    pub sources: Vec<SourceStatus>,
    /// 버퍼 상태
    pub buffer: BufferStats,
    /// 다운스트림에 전달된 배치 수
    pub batches_sent: u64,
    /// 킬 스위치로 버려진 배치 수
    pub batches_skipped: u64,
    /// 다운스트림 처리 에러 수
    pub callback_errors: u64,
    /// 킬 스위치 활성 여부
    pub killswitch_active: bool,
}

/// 리더 태스크와 공유되는 소스 상태
struct SourceState {
    id: String,
    path: PathBuf,
    kind: SourceKind,
    available: bool,
    permission_ok: bool,
    lines_read: u64,
}

/// 배치 전달 카운터
#[derive(Default)]
struct ControllerCounters {
    batches_sent: AtomicU64,
    batches_skipped: AtomicU64,
    callback_errors: AtomicU64,
}

/// 수집 컨트롤러
///
/// # 사용 예시
/// ```ignore
/// use soctide_ingest::{IngestionControllerBuilder, IngestionConfig};
///
/// let mut controller = IngestionControllerBuilder::new()
///     .config(config)
///     .processor(processor)          // Arc<Mutex<dyn BatchProcessor>>
///     .killswitch(hub.probe())
///     .build()?;
///
/// controller.start().await?;
/// ```
pub struct IngestionController {
    /// 수집 설정
    config: IngestionConfig,
    /// 현재 상태
    state: ControllerState,
    /// 공유 마이크로 배치 버퍼
    buffer: Arc<Mutex<MicroBatchBuffer>>,
    /// 다운스트림 배치 소비자
    processor: Arc<Mutex<dyn BatchProcessor>>,
    /// 킬 스위치 조회 클로저
    killswitch: KillswitchProbe,
    /// 소스 레지스트리 (리더 태스크와 공유)
    sources: Vec<Arc<Mutex<SourceState>>>,
    /// 배치 전달 카운터
    counters: Arc<ControllerCounters>,
    /// 태스크 취소 토큰
    cancel: CancellationToken,
    /// 백그라운드 태스크 핸들
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl IngestionController {
    /// 파일 소스를 등록합니다.
    ///
    /// 실행 중에는 등록할 수 없습니다. 권한 확인은 등록 시점에 한 번
    /// 수행되고 이후 리더 태스크가 갱신합니다.
    pub fn add_file_source(
        &mut self,
        id: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<(), IngestError> {
        self.add_source(id.into(), path.into(), SourceKind::File)
    }

    /// 디렉토리 소스를 등록합니다.
    pub fn add_directory_source(
        &mut self,
        id: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Result<(), IngestError> {
        self.add_source(id.into(), dir.into(), SourceKind::Directory)
    }

    fn add_source(
        &mut self,
        id: String,
        path: PathBuf,
        kind: SourceKind,
    ) -> Result<(), IngestError> {
        if self.state == ControllerState::Running {
            return Err(IngestError::AlreadyRunning);
        }
        for source in &self.sources {
            // 등록 단계에서는 태스크가 없으므로 잠금 경합이 없음
            if source
                .try_lock()
                .map(|s| s.id == id)
                .unwrap_or(false)
            {
                return Err(IngestError::DuplicateSource(id));
            }
        }

        let available = path.exists();
        let permission_ok = check_permission(&path, kind);
        self.sources.push(Arc::new(Mutex::new(SourceState {
            id,
            path,
            kind,
            available,
            permission_ok,
            lines_read: 0,
        })));
        Ok(())
    }

    /// 현재 상태 보고서를 생성합니다.
    pub async fn status(&self) -> IngestionStatus {
        let mut sources = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let s = source.lock().await;
            sources.push(SourceStatus {
                id: s.id.clone(),
                path: s.path.display().to_string(),
                kind: s.kind,
                available: s.available,
                permission_ok: s.permission_ok,
                lines_read: s.lines_read,
            });
        }

        IngestionStatus {
            running: self.state == ControllerState::Running,
            os_type: std::env::consts::OS.to_owned(),
            sources,
            buffer: self.buffer.lock().await.stats(),
            batches_sent: self.counters.batches_sent.load(Ordering::Relaxed),
            batches_skipped: self.counters.batches_skipped.load(Ordering::Relaxed),
            callback_errors: self.counters.callback_errors.load(Ordering::Relaxed),
            killswitch_active: (self.killswitch)(),
        }
    }

    /// 버퍼 상태 스냅샷을 반환합니다.
    pub async fn buffer_stats(&self) -> BufferStats {
        self.buffer.lock().await.stats()
    }

    /// 버퍼 드롭 카운터를 리셋합니다.
    pub async fn reset_buffer_counters(&self) {
        self.buffer.lock().await.reset_counters();
    }

    fn spawn_reader(&mut self, source: Arc<Mutex<SourceState>>) {
        let buffer = Arc::clone(&self.buffer);
        let cancel = self.cancel.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let grace = Duration::from_secs(self.config.grace_period_secs);
        let read_from_start = self.config.read_from_start;
        let pattern = self.config.file_pattern.clone();

        let task = tokio::spawn(async move {
            let (kind, path) = {
                let s = source.lock().await;
                (s.kind, s.path.clone())
            };
            match kind {
                SourceKind::File => {
                    run_file_reader(source, path, buffer, cancel, poll_interval, read_from_start)
                        .await;
                }
                SourceKind::Directory => {
                    run_directory_reader(source, path, pattern, buffer, cancel, poll_interval, grace)
                        .await;
                }
            }
        });
        self.tasks.push(task);
    }

    fn spawn_drainer(&mut self) {
        let buffer = Arc::clone(&self.buffer);
        let processor = Arc::clone(&self.processor);
        let killswitch = Arc::clone(&self.killswitch);
        let counters = Arc::clone(&self.counters);
        let cancel = self.cancel.clone();
        let enforce = self.config.enforce_killswitch;
        let drain_tick = Duration::from_millis(self.config.drain_tick_ms);
        let batch_interval = Duration::from_secs_f64(self.config.batch_interval_secs);

        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(drain_tick);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let records = {
                            let mut buf = buffer.lock().await;
                            if !buf.should_flush(batch_interval) {
                                continue;
                            }
                            buf.flush()
                        };
                        if records.is_empty() {
                            continue;
                        }
                        dispatch_batch(records, &processor, &killswitch, enforce, &counters).await;
                    }
                }
            }
        });
        self.tasks.push(task);
    }
}

impl Pipeline for IngestionController {
    async fn start(&mut self) -> Result<(), SoctideError> {
        if self.state == ControllerState::Running {
            return Err(IngestError::AlreadyRunning.into());
        }

        tracing::info!(
            sources = self.sources.len(),
            max_batch_size = self.config.max_batch_size,
            "starting ingestion controller"
        );

        self.cancel = CancellationToken::new();
        let sources: Vec<_> = self.sources.iter().map(Arc::clone).collect();
        for source in sources {
            self.spawn_reader(source);
        }
        self.spawn_drainer();

        self.state = ControllerState::Running;
        tracing::info!("ingestion controller started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SoctideError> {
        if self.state != ControllerState::Running {
            return Err(IngestError::NotRunning.into());
        }

        tracing::info!("stopping ingestion controller");
        self.cancel.cancel();

        let deadline = Duration::from_secs(self.config.stop_timeout_secs);
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(deadline, task).await.is_err() {
                tracing::warn!("reader task did not stop within timeout, detaching");
            }
        }

        // 킬 스위치가 내려가 있을 때만 잔여 버퍼를 마지막으로 플러시
        let remaining = self.buffer.lock().await.flush();
        if !remaining.is_empty() {
            if self.config.enforce_killswitch && (self.killswitch)() {
                tracing::warn!(
                    discarded = remaining.len(),
                    "killswitch active at shutdown, discarding remaining records"
                );
                self.counters
                    .batches_skipped
                    .fetch_add(1, Ordering::Relaxed);
            } else {
                tracing::info!(count = remaining.len(), "flushing remaining buffered records");
                dispatch_batch(
                    remaining,
                    &self.processor,
                    &self.killswitch,
                    self.config.enforce_killswitch,
                    &self.counters,
                )
                .await;
            }
        }

        self.state = ControllerState::Stopped;
        tracing::info!("ingestion controller stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ControllerState::Running => {
                let utilization = self.buffer.lock().await.utilization();
                if utilization > 0.9 {
                    HealthStatus::Degraded(format!(
                        "buffer utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            ControllerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ControllerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 배치를 킬 스위치 게이트를 거쳐 다운스트림에 전달합니다.
async fn dispatch_batch(
    records: Vec<ParsedRecord>,
    processor: &Arc<Mutex<dyn BatchProcessor>>,
    killswitch: &KillswitchProbe,
    enforce: bool,
    counters: &ControllerCounters,
) {
    if enforce && killswitch() {
        tracing::warn!(
            discarded = records.len(),
            "killswitch active, discarding drained batch"
        );
        counters.batches_skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let batch = Batch::new(records);
    let batch_id = batch.batch_id.clone();
    let result = processor.lock().await.process_batch(batch);
    match result {
        Ok(Some(report)) => {
            counters.batches_sent.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                batch_id = batch_id.as_str(),
                processed = report.processed,
                alerts = report.alerts.len(),
                "batch processed"
            );
        }
        Ok(None) => {
            counters.batches_skipped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(batch_id = batch_id.as_str(), "batch skipped by processor");
        }
        Err(e) => {
            counters.callback_errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                batch_id = batch_id.as_str(),
                error = %e,
                "batch processing failed, continuing"
            );
        }
    }
}

async fn run_file_reader(
    source: Arc<Mutex<SourceState>>,
    path: PathBuf,
    buffer: Arc<Mutex<MicroBatchBuffer>>,
    cancel: CancellationToken,
    poll_interval: Duration,
    read_from_start: bool,
) {
    let mut tailer = FileTailer::new(&path);
    if !read_from_start {
        if let Err(e) = tailer.seek_to_end() {
            tracing::warn!(path = %path.display(), error = %e, "failed to seek to end");
        }
    }

    let label = path.display().to_string();
    let mut tick = tokio::time::interval(poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match tailer.read_new_lines() {
                    Ok(lines) => {
                        {
                            let mut s = source.lock().await;
                            s.available = tailer.is_available();
                            s.lines_read = tailer.lines_read();
                            if tailer.is_available() {
                                s.permission_ok = check_permission(&path, SourceKind::File);
                            }
                        }
                        if !lines.is_empty() {
                            let mut buf = buffer.lock().await;
                            for line in lines {
                                buf.add(ParsedRecord::from_raw_line(line, label.as_str()));
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "tail read failed");
                        let mut s = source.lock().await;
                        s.available = false;
                        s.permission_ok = check_permission(&path, SourceKind::File);
                    }
                }
            }
        }
    }
}

async fn run_directory_reader(
    source: Arc<Mutex<SourceState>>,
    dir: PathBuf,
    pattern: String,
    buffer: Arc<Mutex<MicroBatchBuffer>>,
    cancel: CancellationToken,
    poll_interval: Duration,
    grace: Duration,
) {
    let mut watcher = DirectoryWatcher::new(&dir, pattern, grace);
    let mut tick = tokio::time::interval(poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match watcher.poll() {
                    Ok(collected) => {
                        let line_total: u64 = collected
                            .iter()
                            .map(|(_, lines)| lines.len() as u64)
                            .sum();
                        {
                            let mut s = source.lock().await;
                            s.available = dir.exists();
                            s.lines_read += line_total;
                            s.permission_ok = check_permission(&dir, SourceKind::Directory);
                        }
                        if line_total > 0 {
                            let mut buf = buffer.lock().await;
                            for (path, lines) in collected {
                                let label = path.display().to_string();
                                for line in lines {
                                    buf.add(ParsedRecord::from_raw_line(line, label.as_str()));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "directory poll failed");
                        let mut s = source.lock().await;
                        s.available = false;
                    }
                }
            }
        }
    }
}

/// 읽기 권한을 확인합니다. 경로가 없으면 판단을 유보하고 `true`를 반환합니다.
fn check_permission(path: &std::path::Path, kind: SourceKind) -> bool {
    if !path.exists() {
        return true;
    }
    match kind {
        SourceKind::File => std::fs::File::open(path).is_ok(),
        SourceKind::Directory => std::fs::read_dir(path).is_ok(),
    }
}

/// 수집 컨트롤러 빌더
///
/// 컨트롤러를 구성하고 설정된 소스를 등록합니다.
pub struct IngestionControllerBuilder {
    config: IngestionConfig,
    processor: Option<Arc<Mutex<dyn BatchProcessor>>>,
    killswitch: Option<KillswitchProbe>,
}

impl IngestionControllerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: IngestionConfig::default(),
            processor: None,
            killswitch: None,
        }
    }

    /// 수집 설정을 지정합니다.
    pub fn config(mut self, config: IngestionConfig) -> Self {
        self.config = config;
        self
    }

    /// 다운스트림 배치 소비자를 지정합니다.
    pub fn processor(mut self, processor: Arc<Mutex<dyn BatchProcessor>>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// 킬 스위치 조회 클로저를 지정합니다.
    ///
    /// 지정하지 않으면 항상 비활성으로 간주합니다.
    pub fn killswitch(mut self, probe: KillswitchProbe) -> Self {
        self.killswitch = Some(probe);
        self
    }

    /// 컨트롤러를 빌드합니다.
    ///
    /// 설정의 `file_paths`와 `directories`가 소스로 등록됩니다.
    pub fn build(self) -> Result<IngestionController, IngestError> {
        self.config.validate()?;

        let processor = self.processor.ok_or_else(|| IngestError::Config {
            field: "processor".to_owned(),
            reason: "batch processor is required".to_owned(),
        })?;
        let killswitch = self.killswitch.unwrap_or_else(|| Arc::new(|| false));

        let buffer = Arc::new(Mutex::new(MicroBatchBuffer::new(self.config.max_batch_size)));

        let mut controller = IngestionController {
            config: self.config,
            state: ControllerState::Initialized,
            buffer,
            processor,
            killswitch,
            sources: Vec::new(),
            counters: Arc::new(ControllerCounters::default()),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        };

        for path in controller.config.file_paths.clone() {
            controller.add_source(path.clone(), PathBuf::from(&path), SourceKind::File)?;
        }
        for dir in controller.config.directories.clone() {
            controller.add_source(dir.clone(), PathBuf::from(&dir), SourceKind::Directory)?;
        }

        Ok(controller)
    }
}

impl Default for IngestionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soctide_core::pipeline::BatchReport;

    struct CountingProcessor {
        batches: usize,
        records: usize,
    }

    impl BatchProcessor for CountingProcessor {
        fn process_batch(&mut self, batch: Batch) -> Result<Option<BatchReport>, SoctideError> {
            self.batches += 1;
            self.records += batch.len();
            Ok(Some(BatchReport {
                batch_id: batch.batch_id,
                processed: batch.records.len(),
                ..BatchReport::default()
            }))
        }
    }

    fn test_processor() -> Arc<Mutex<dyn BatchProcessor>> {
        Arc::new(Mutex::new(CountingProcessor {
            batches: 0,
            records: 0,
        }))
    }

    #[test]
    fn builder_requires_processor() {
        let result = IngestionControllerBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_registers_configured_sources() {
        let config = crate::config::IngestionConfigBuilder::new()
            .file_paths(vec!["/tmp/a.log".to_owned(), "/tmp/b.log".to_owned()])
            .directories(vec!["/tmp/logs".to_owned()])
            .build()
            .unwrap();
        let controller = IngestionControllerBuilder::new()
            .config(config)
            .processor(test_processor())
            .build()
            .unwrap();
        assert_eq!(controller.sources.len(), 3);
    }

    #[test]
    fn duplicate_source_id_rejected() {
        let mut controller = IngestionControllerBuilder::new()
            .processor(test_processor())
            .build()
            .unwrap();
        controller.add_file_source("auth", "/tmp/auth.log").unwrap();
        let err = controller.add_file_source("auth", "/tmp/other.log");
        assert!(matches!(err, Err(IngestError::DuplicateSource(_))));
    }

    #[tokio::test]
    async fn status_reports_os_and_killswitch() {
        let controller = IngestionControllerBuilder::new()
            .processor(test_processor())
            .killswitch(Arc::new(|| true))
            .build()
            .unwrap();
        let status = controller.status().await;
        assert!(!status.running);
        assert!(status.killswitch_active);
        assert_eq!(status.os_type, std::env::consts::OS);
    }

    #[tokio::test]
    async fn lifecycle_guards() {
        let mut controller = IngestionControllerBuilder::new()
            .processor(test_processor())
            .build()
            .unwrap();

        // 시작 전 stop은 실패
        assert!(controller.stop().await.is_err());
        assert!(controller.health_check().await.is_unhealthy());

        controller.start().await.unwrap();
        assert!(controller.health_check().await.is_healthy());

        // 이중 시작은 실패
        assert!(controller.start().await.is_err());

        controller.stop().await.unwrap();
        assert!(controller.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn killswitch_discards_drained_batch() {
        let processor = Arc::new(Mutex::new(CountingProcessor {
            batches: 0,
            records: 0,
        }));
        let counters = ControllerCounters::default();
        let probe: KillswitchProbe = Arc::new(|| true);

        let records = vec![ParsedRecord::from_raw_line("x", "s")];
        let dyn_processor: Arc<Mutex<dyn BatchProcessor>> = processor.clone();
        dispatch_batch(records, &dyn_processor, &probe, true, &counters).await;

        assert_eq!(counters.batches_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(counters.batches_sent.load(Ordering::Relaxed), 0);
        assert_eq!(processor.lock().await.batches, 0);
    }

    #[tokio::test]
    async fn processor_errors_are_isolated() {
        struct FailingProcessor;
        impl BatchProcessor for FailingProcessor {
            fn process_batch(
                &mut self,
                _batch: Batch,
            ) -> Result<Option<BatchReport>, SoctideError> {
                Err(soctide_core::error::PipelineError::InitFailed("boom".to_owned()).into())
            }
        }

        let processor: Arc<Mutex<dyn BatchProcessor>> = Arc::new(Mutex::new(FailingProcessor));
        let counters = ControllerCounters::default();
        let probe: KillswitchProbe = Arc::new(|| false);

        let records = vec![ParsedRecord::from_raw_line("x", "s")];
        dispatch_batch(records, &processor, &probe, true, &counters).await;

        assert_eq!(counters.callback_errors.load(Ordering::Relaxed), 1);
        assert_eq!(counters.batches_sent.load(Ordering::Relaxed), 0);
    }
}
