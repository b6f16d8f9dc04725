//! 알림 생성
//!
//! 융합 결과와 레코드 컨텍스트에서 [`Alert`]를 만듭니다. 위협
//! 범주별 MITRE ATT&CK 기법 주석은 정적 테이블에서 가져옵니다.

use std::time::SystemTime;

use soctide_core::types::{Alert, AlertStatus, EnsembleResult, ParsedRecord, ThreatCategory};

/// 위협 범주별 MITRE ATT&CK 기법 ID
pub fn mitre_techniques(category: ThreatCategory) -> &'static [&'static str] {
    match category {
        ThreatCategory::DDoS => &["T1498", "T1499"],
        ThreatCategory::BruteForce => &["T1110", "T1078"],
        ThreatCategory::Malware => &["T1059", "T1547"],
        ThreatCategory::Exfiltration => &["T1041", "T1560"],
        ThreatCategory::Benign | ThreatCategory::Unknown => &[],
    }
}

/// 알림 생성기
pub struct AlertGenerator {
    total_generated: u64,
}

impl AlertGenerator {
    /// 새 생성기를 만듭니다.
    pub fn new() -> Self {
        Self { total_generated: 0 }
    }

    /// 지금까지 생성한 알림 수
    pub fn total_generated(&self) -> u64 {
        self.total_generated
    }

    /// 융합 결과에서 알림을 생성합니다. 상태는 `New`로 시작합니다.
    pub fn generate(&mut self, result: &EnsembleResult, record: &ParsedRecord) -> Alert {
        self.generate_with_status(result, record, AlertStatus::New)
    }

    /// 초기 상태를 지정해 알림을 생성합니다.
    ///
    /// 억제된 범주의 알림은 `Suppressed` 상태로 만들어집니다.
    pub fn generate_with_status(
        &mut self,
        result: &EnsembleResult,
        record: &ParsedRecord,
        status: AlertStatus,
    ) -> Alert {
        self.total_generated += 1;
        let alert = Alert {
            alert_id: uuid::Uuid::new_v4().to_string(),
            created_at: SystemTime::now(),
            priority: result.priority,
            classification: result.classification.clone(),
            threat_category: result.threat_category,
            risk_level: result.risk_level,
            anomaly_score: result.anomaly_score,
            source_ip: record.source_ip,
            mitre_techniques: mitre_techniques(result.threat_category)
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            status,
        };
        tracing::info!(
            alert_id = alert.alert_id.as_str(),
            priority = %alert.priority,
            classification = alert.classification.as_str(),
            status = %alert.status,
            "alert generated"
        );
        alert
    }
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::new()
    }
}
