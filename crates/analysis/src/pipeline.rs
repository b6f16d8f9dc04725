//! 판단 파이프라인 — 배치 소비와 알림 산출
//!
//! 수집 엔진에서 넘어온 배치를 레코드 단위로 스코어링하고, 융합
//! 결과에 따라 알림을 생성합니다. 킬 스위치가 활성이면 배치 전체를
//! 건너뛰고 `Ok(None)`을 반환합니다 — 이는 에러가 아닙니다.
//!
//! 우선순위 규칙: P1~P3는 중복 제거를 우회하고 항상 알림을
//! 생성합니다. P4만 지문 기반 쿨다운의 대상입니다. 억제 중인 위협
//! 범주의 알림은 `New` 대신 `Suppressed` 상태로 만들어지고 이벤트로
//! 내보내지 않습니다.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use soctide_core::error::SoctideError;
use soctide_core::event::AlertEvent;
use soctide_core::pipeline::{
    BatchProcessor, BatchReport, HealthStatus, KillswitchProbe, Pipeline, Scorer,
};
use soctide_core::types::{Alert, AlertStatus, Batch, ModelVerdict, ThreatCategory};

use crate::alert::AlertGenerator;
use crate::config::AnalysisConfig;
use crate::dedup::{fingerprint_event, EventDeduplicator};
use crate::ensemble::EnsembleCoordinator;
use crate::error::AnalysisError;

/// 억제 범주 조회 클로저
///
/// 판단 파이프라인은 거버넌스 크레이트에 직접 의존하지 않고 이
/// 클로저로 현재 억제 중인 범주만 조회합니다.
pub type SuppressionProbe = Arc<dyn Fn() -> Vec<ThreatCategory> + Send + Sync>;

/// 파이프라인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Initialized,
    Running,
    Stopped,
}

/// 판단 계층 누적 통계
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// 처리한 배치 수
    pub batches: u64,
    /// 처리한 레코드 수
    pub records: u64,
    /// 생성된 알림 수
    pub alerts: u64,
    /// 억제된 레코드 수 (중복 제거 + 범주 억제)
    pub suppressed: u64,
    /// 스코어러 실패로 건너뛴 레코드 수
    pub errors: u64,
}

/// 판단 파이프라인
///
/// [`BatchProcessor`]로서 수집 엔진의 다운스트림에 연결됩니다.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    state: PipelineState,
    coordinator: EnsembleCoordinator,
    dedup: EventDeduplicator,
    generator: AlertGenerator,
    scorers: Vec<Arc<dyn Scorer>>,
    killswitch: KillswitchProbe,
    suppressions: SuppressionProbe,
    alert_tx: Option<mpsc::Sender<AlertEvent>>,
    recent_alerts: VecDeque<Alert>,
    stats: AnalysisStats,
    records_since_cleanup: usize,
}

impl AnalysisPipeline {
    /// 빌더를 생성합니다.
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::new()
    }

    /// 누적 통계 스냅샷
    pub fn stats(&self) -> AnalysisStats {
        self.stats
    }

    /// 최근 알림을 최신순으로 반환합니다.
    pub fn latest_alerts(&self, limit: usize) -> Vec<Alert> {
        self.recent_alerts
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// 중복 제거 상태를 초기화합니다. 재분석 강제 오버라이드가
    /// 적용될 때 호출됩니다.
    pub fn reset_dedup(&mut self) {
        self.dedup.reset();
        tracing::info!("dedup state reset, reanalysis forced");
    }

    fn score_record(
        &self,
        record: &soctide_core::types::ParsedRecord,
    ) -> Result<Vec<ModelVerdict>, SoctideError> {
        let mut verdicts = Vec::with_capacity(self.scorers.len());
        for scorer in &self.scorers {
            verdicts.push(scorer.score(record)?);
        }
        Ok(verdicts)
    }

    fn remember_alert(&mut self, alert: Alert) {
        if self.recent_alerts.len() >= self.config.alert_history_capacity {
            self.recent_alerts.pop_front();
        }
        self.recent_alerts.push_back(alert);
    }

    fn emit_alert(&self, alert: &Alert) {
        if let Some(tx) = &self.alert_tx {
            let event = AlertEvent::new(alert.clone());
            if let Err(e) = tx.try_send(event) {
                tracing::warn!(error = %e, "alert event channel full or closed, event dropped");
            }
        }
    }
}

impl BatchProcessor for AnalysisPipeline {
    fn process_batch(&mut self, batch: Batch) -> Result<Option<BatchReport>, SoctideError> {
        if (self.killswitch)() {
            tracing::warn!(batch_id = batch.batch_id.as_str(), "killswitch active, batch skipped");
            return Ok(None);
        }

        let suppressed_categories: HashSet<ThreatCategory> =
            (self.suppressions)().into_iter().collect();

        let mut report = BatchReport {
            batch_id: batch.batch_id.clone(),
            ..BatchReport::default()
        };

        for record in &batch.records {
            self.records_since_cleanup += 1;
            if self.records_since_cleanup >= self.config.cleanup_interval {
                self.dedup.cleanup_old_entries(self.config.dedup_window);
                self.records_since_cleanup = 0;
            }

            let verdicts = match self.score_record(record) {
                Ok(verdicts) => verdicts,
                Err(e) => {
                    tracing::error!(
                        source = record.source.as_str(),
                        error = %e,
                        "scorer failed, record skipped"
                    );
                    report.errors += 1;
                    continue;
                }
            };

            let result = self.coordinator.fuse(&verdicts);
            report.processed += 1;

            if suppressed_categories.contains(&result.threat_category) {
                let alert = self.generator.generate_with_status(
                    &result,
                    record,
                    AlertStatus::Suppressed,
                );
                report.suppressed += 1;
                report.alerts.push(alert.clone());
                self.remember_alert(alert);
                continue;
            }

            if !result.priority.is_alert_worthy() {
                let fingerprint = fingerprint_event(
                    &result.classification,
                    result.anomaly_score,
                    record.source_ip,
                );
                if !self.dedup.should_process(&fingerprint) {
                    tracing::debug!(
                        fingerprint = %fingerprint,
                        classification = result.classification.as_str(),
                        "duplicate low-priority event suppressed"
                    );
                    report.suppressed += 1;
                    continue;
                }
            }

            let alert = self.generator.generate(&result, record);
            self.emit_alert(&alert);
            report.alerts.push(alert.clone());
            self.remember_alert(alert);
        }

        self.stats.batches += 1;
        self.stats.records += report.processed as u64;
        self.stats.alerts += report.alerts.len() as u64;
        self.stats.suppressed += report.suppressed as u64;
        self.stats.errors += report.errors as u64;

        tracing::debug!(
            batch_id = report.batch_id.as_str(),
            processed = report.processed,
            alerts = report.alerts.len(),
            suppressed = report.suppressed,
            errors = report.errors,
            "batch analyzed"
        );
        Ok(Some(report))
    }
}

impl Pipeline for AnalysisPipeline {
    async fn start(&mut self) -> Result<(), SoctideError> {
        if self.state == PipelineState::Running {
            return Err(AnalysisError::AlreadyRunning.into());
        }
        self.state = PipelineState::Running;
        tracing::info!(scorers = self.scorers.len(), "analysis pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SoctideError> {
        if self.state != PipelineState::Running {
            return Err(AnalysisError::NotRunning.into());
        }
        self.state = PipelineState::Stopped;
        tracing::info!(
            batches = self.stats.batches,
            alerts = self.stats.alerts,
            "analysis pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.state != PipelineState::Running {
            return HealthStatus::Unhealthy("pipeline not running".to_owned());
        }
        if (self.killswitch)() {
            return HealthStatus::Degraded("killswitch active".to_owned());
        }
        HealthStatus::Healthy
    }
}

/// [`AnalysisPipeline`] 빌더
pub struct AnalysisPipelineBuilder {
    config: AnalysisConfig,
    scorers: Vec<Arc<dyn Scorer>>,
    killswitch: KillswitchProbe,
    suppressions: SuppressionProbe,
    alert_tx: Option<mpsc::Sender<AlertEvent>>,
}

impl AnalysisPipelineBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            scorers: Vec::new(),
            killswitch: Arc::new(|| false),
            suppressions: Arc::new(Vec::new),
            alert_tx: None,
        }
    }

    /// 설정을 지정합니다.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// 스코어러를 등록합니다. 최소 하나는 필요합니다.
    pub fn scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorers.push(scorer);
        self
    }

    /// 킬 스위치 조회 클로저를 연결합니다.
    pub fn killswitch(mut self, probe: KillswitchProbe) -> Self {
        self.killswitch = probe;
        self
    }

    /// 억제 범주 조회 클로저를 연결합니다.
    pub fn suppressions(mut self, probe: SuppressionProbe) -> Self {
        self.suppressions = probe;
        self
    }

    /// 알림 이벤트 송신 채널을 연결합니다.
    pub fn alert_sender(mut self, tx: mpsc::Sender<AlertEvent>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    /// 설정을 검증하고 파이프라인을 생성합니다.
    pub fn build(self) -> Result<AnalysisPipeline, AnalysisError> {
        self.config.validate()?;
        if self.scorers.is_empty() {
            return Err(AnalysisError::NoScorers);
        }

        let dedup = EventDeduplicator::new(self.config.dedup_window);
        let coordinator = EnsembleCoordinator::new(self.config.clone());
        Ok(AnalysisPipeline {
            state: PipelineState::Initialized,
            coordinator,
            dedup,
            generator: AlertGenerator::new(),
            scorers: self.scorers,
            killswitch: self.killswitch,
            suppressions: self.suppressions,
            alert_tx: self.alert_tx,
            recent_alerts: VecDeque::with_capacity(self.config.alert_history_capacity),
            stats: AnalysisStats::default(),
            records_since_cleanup: 0,
            config: self.config,
        })
    }
}

impl Default for AnalysisPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use soctide_core::error::ScorerError;
    use soctide_core::types::ParsedRecord;

    /// 고정 레이블/점수를 내는 테스트 스코어러
    struct FixedScorer {
        label: &'static str,
        confidence: f64,
    }

    impl Scorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score(&self, _record: &ParsedRecord) -> Result<ModelVerdict, SoctideError> {
            Ok(ModelVerdict::classification(
                "fixed",
                self.label,
                self.confidence,
            ))
        }
    }

    /// 항상 실패하는 테스트 스코어러
    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn name(&self) -> &str {
            "failing"
        }

        fn score(&self, _record: &ParsedRecord) -> Result<ModelVerdict, SoctideError> {
            Err(ScorerError::Failed {
                scorer: "failing".to_owned(),
                reason: "model unavailable".to_owned(),
            }
            .into())
        }
    }

    fn benign_pipeline() -> AnalysisPipeline {
        AnalysisPipeline::builder()
            .scorer(Arc::new(FixedScorer {
                label: "Benign",
                confidence: 0.9,
            }))
            .build()
            .unwrap()
    }

    fn record(line: &str) -> ParsedRecord {
        ParsedRecord::from_raw_line(line, "/var/log/test.log")
    }

    #[test]
    fn build_requires_a_scorer() {
        let result = AnalysisPipeline::builder().build();
        assert!(matches!(result, Err(AnalysisError::NoScorers)));
    }

    #[test]
    fn killswitch_skips_batch_without_error() {
        let active = Arc::new(AtomicBool::new(true));
        let probe_flag = Arc::clone(&active);
        let mut pipeline = AnalysisPipeline::builder()
            .scorer(Arc::new(FixedScorer {
                label: "DDoS",
                confidence: 0.9,
            }))
            .killswitch(Arc::new(move || probe_flag.load(Ordering::SeqCst)))
            .build()
            .unwrap();

        let report = pipeline
            .process_batch(Batch::new(vec![record("syn flood")]))
            .unwrap();
        assert!(report.is_none());
        assert_eq!(pipeline.stats().batches, 0);

        // 해제 후에는 정상 처리
        active.store(false, Ordering::SeqCst);
        let report = pipeline
            .process_batch(Batch::new(vec![record("syn flood")]))
            .unwrap();
        assert_eq!(report.unwrap().alerts.len(), 1);
    }

    #[test]
    fn high_priority_bypasses_dedup() {
        let mut pipeline = AnalysisPipeline::builder()
            .scorer(Arc::new(FixedScorer {
                label: "DDoS",
                confidence: 0.9,
            }))
            .build()
            .unwrap();

        // 동일한 레코드 두 번 — 둘 다 알림
        let report = pipeline
            .process_batch(Batch::new(vec![record("flood"), record("flood")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.suppressed, 0);
    }

    #[test]
    fn low_priority_duplicates_are_suppressed() {
        let mut pipeline = benign_pipeline();
        let report = pipeline
            .process_batch(Batch::new(vec![record("ok"), record("ok")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.suppressed, 1);
    }

    #[test]
    fn scorer_failure_skips_record_only() {
        let mut pipeline = AnalysisPipeline::builder()
            .scorer(Arc::new(FailingScorer))
            .build()
            .unwrap();

        let report = pipeline
            .process_batch(Batch::new(vec![record("a"), record("b")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.errors, 2);
        assert_eq!(report.processed, 0);
        assert!(report.alerts.is_empty());
        assert_eq!(pipeline.stats().errors, 2);
    }

    #[test]
    fn suppressed_category_marks_alert_suppressed() {
        let mut pipeline = AnalysisPipeline::builder()
            .scorer(Arc::new(FixedScorer {
                label: "DDoS",
                confidence: 0.9,
            }))
            .suppressions(Arc::new(|| vec![ThreatCategory::DDoS]))
            .build()
            .unwrap();

        let report = pipeline
            .process_batch(Batch::new(vec![record("flood")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.suppressed, 1);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].status, AlertStatus::Suppressed);
    }

    #[test]
    fn recent_alerts_ring_is_bounded() {
        let config = AnalysisConfig {
            alert_history_capacity: 3,
            ..AnalysisConfig::default()
        };
        let mut pipeline = AnalysisPipeline::builder()
            .config(config)
            .scorer(Arc::new(FixedScorer {
                label: "DDoS",
                confidence: 0.9,
            }))
            .build()
            .unwrap();

        for i in 0..5 {
            pipeline
                .process_batch(Batch::new(vec![record(&format!("flood {i}"))]))
                .unwrap();
        }
        assert_eq!(pipeline.latest_alerts(10).len(), 3);
        assert_eq!(pipeline.stats().alerts, 5);
    }

    #[test]
    fn reset_dedup_allows_reprocessing() {
        let mut pipeline = benign_pipeline();
        pipeline
            .process_batch(Batch::new(vec![record("ok")]))
            .unwrap();
        let report = pipeline
            .process_batch(Batch::new(vec![record("ok")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.suppressed, 1);

        pipeline.reset_dedup();
        let report = pipeline
            .process_batch(Batch::new(vec![record("ok")]))
            .unwrap()
            .unwrap();
        assert_eq!(report.alerts.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_guards() {
        let mut pipeline = benign_pipeline();
        assert!(pipeline.health_check().await.is_unhealthy());

        pipeline.start().await.unwrap();
        assert!(pipeline.start().await.is_err());
        assert!(pipeline.health_check().await.is_healthy());

        pipeline.stop().await.unwrap();
        assert!(pipeline.stop().await.is_err());
    }

    #[tokio::test]
    async fn alert_events_are_emitted() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut pipeline = AnalysisPipeline::builder()
            .scorer(Arc::new(FixedScorer {
                label: "Malware",
                confidence: 0.8,
            }))
            .alert_sender(tx)
            .build()
            .unwrap();

        pipeline
            .process_batch(Batch::new(vec![record("dropper.exe")]))
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.alert.classification, "Malware");
    }
}
