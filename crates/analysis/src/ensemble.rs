//! 앙상블 융합 — 스코어러 출력을 하나의 판단으로 결합
//!
//! 분류 레이블은 신뢰도가 가장 높은 분류 결과에서 취하고, 이상
//! 점수는 신뢰도 가중 평균으로 융합합니다. 위험 점수는 두 신호의
//! 가중 합이며, 고정 임계값으로 등급화한 뒤 심각도 하한 테이블로
//! 상향 보정합니다. 동일 입력에 대해 항상 동일한 결과를 냅니다.

use soctide_core::types::{AlertPriority, EnsembleResult, ModelVerdict, ThreatCategory};

use crate::config::{category_severity, AnalysisConfig};

/// 앙상블 융합기
pub struct EnsembleCoordinator {
    config: AnalysisConfig,
}

impl EnsembleCoordinator {
    /// 설정으로 융합기를 생성합니다.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// 스코어러 출력들을 융합합니다.
    ///
    /// 분류 결과가 없으면 `Unknown`, 이상 점수가 없으면 0.0으로
    /// 처리합니다. 신뢰도 동률일 때는 먼저 온 결과가 이깁니다.
    pub fn fuse(&self, verdicts: &[ModelVerdict]) -> EnsembleResult {
        let chosen = verdicts
            .iter()
            .filter(|v| v.label.is_some())
            .fold(None::<&ModelVerdict>, |best, v| match best {
                Some(b) if b.confidence >= v.confidence => Some(b),
                _ => Some(v),
            });

        let (classification, class_confidence) = match chosen {
            Some(v) => (
                v.label.clone().unwrap_or_else(|| "Unknown".to_owned()),
                v.confidence,
            ),
            None => ("Unknown".to_owned(), 0.0),
        };
        let threat_category = ThreatCategory::from_label(&classification);

        let anomaly_score = fuse_anomaly(verdicts);

        let risk_score = (self.config.anomaly_weight * anomaly_score
            + self.config.classification_weight
                * category_severity(threat_category)
                * class_confidence)
            .clamp(0.0, 1.0);

        let mut risk_level = self.config.risk_level_for(risk_score);
        if let Some(floor) = self.config.severity_floor.get(&threat_category) {
            if *floor > risk_level {
                tracing::debug!(
                    category = %threat_category,
                    from = %risk_level,
                    to = %floor,
                    "risk level raised to severity floor"
                );
                risk_level = *floor;
            }
        }

        EnsembleResult {
            classification,
            threat_category,
            anomaly_score,
            risk_score,
            risk_level,
            priority: AlertPriority::from_risk(risk_level),
            contributions: verdicts.to_vec(),
        }
    }
}

/// 이상 점수의 신뢰도 가중 평균
///
/// 가중치 합이 0이면 단순 평균으로 대체합니다.
fn fuse_anomaly(verdicts: &[ModelVerdict]) -> f64 {
    let scored: Vec<(f64, f64)> = verdicts
        .iter()
        .filter_map(|v| v.score.map(|s| (s, v.confidence)))
        .collect();
    if scored.is_empty() {
        return 0.0;
    }

    let weight_sum: f64 = scored.iter().map(|(_, w)| w).sum();
    let fused = if weight_sum > 0.0 {
        scored.iter().map(|(s, w)| s * w).sum::<f64>() / weight_sum
    } else {
        scored.iter().map(|(s, _)| s).sum::<f64>() / scored.len() as f64
    };
    fused.clamp(0.0, 1.0)
}
