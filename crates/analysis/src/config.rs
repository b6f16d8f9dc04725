//! 판단 계층 런타임 설정
//!
//! 전역 설정의 `[analysis]` 섹션에서 유도하되, 판단 계층에서만 쓰는
//! 세부 파라미터(위험 점수 임계값, 심각도 하한 테이블, 중복 제거
//! 정리 주기)를 추가로 가집니다.

use std::collections::HashMap;
use std::time::Duration;

use soctide_core::config::AnalysisConfig as CoreAnalysisConfig;
use soctide_core::types::{RiskLevel, ThreatCategory};

use crate::error::AnalysisError;

/// 판단 파이프라인 설정
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// 이상 점수 가중치
    pub anomaly_weight: f64,
    /// 분류 심각도 가중치
    pub classification_weight: f64,
    /// 중복 제거 쿨다운 윈도우
    pub dedup_window: Duration,
    /// 최근 알림 보관 개수
    pub alert_history_capacity: usize,
    /// 중복 제거 엔트리 정리 주기 (처리 레코드 수 기준)
    pub cleanup_interval: usize,
    /// 위험 점수 등급 임계값 — Low 시작점
    pub risk_low: f64,
    /// Medium 시작점
    pub risk_medium: f64,
    /// High 시작점
    pub risk_high: f64,
    /// Critical 시작점
    pub risk_critical: f64,
    /// 위협 범주별 최소 위험도 하한
    pub severity_floor: HashMap<ThreatCategory, RiskLevel>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_weight: 0.4,
            classification_weight: 0.6,
            dedup_window: Duration::from_secs(300),
            alert_history_capacity: 100,
            cleanup_interval: 1000,
            risk_low: 0.25,
            risk_medium: 0.45,
            risk_high: 0.65,
            risk_critical: 0.80,
            severity_floor: default_severity_floor(),
        }
    }
}

/// 기본 심각도 하한 테이블
///
/// 특정 범주는 모델 신뢰도와 무관하게 본질적으로 심각합니다.
pub fn default_severity_floor() -> HashMap<ThreatCategory, RiskLevel> {
    HashMap::from([
        (ThreatCategory::DDoS, RiskLevel::High),
        (ThreatCategory::BruteForce, RiskLevel::High),
        (ThreatCategory::Malware, RiskLevel::Critical),
        (ThreatCategory::Exfiltration, RiskLevel::Critical),
    ])
}

/// 위협 범주별 기본 심각도 가중치
///
/// 위험 점수 계산의 `severity(category)` 항입니다.
pub fn category_severity(category: ThreatCategory) -> f64 {
    match category {
        ThreatCategory::Benign => 0.0,
        ThreatCategory::DDoS => 0.6,
        ThreatCategory::BruteForce => 0.7,
        ThreatCategory::Malware => 0.9,
        ThreatCategory::Exfiltration => 1.0,
        ThreatCategory::Unknown => 0.5,
    }
}

impl AnalysisConfig {
    /// 전역 설정의 `[analysis]` 섹션에서 설정을 유도합니다.
    pub fn from_core(core: &CoreAnalysisConfig) -> Self {
        Self {
            anomaly_weight: core.anomaly_weight,
            classification_weight: core.classification_weight,
            dedup_window: Duration::from_secs(core.dedup_window_secs),
            alert_history_capacity: core.alert_history_capacity,
            ..Self::default()
        }
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (field, value) in [
            ("anomaly_weight", self.anomaly_weight),
            ("classification_weight", self.classification_weight),
        ] {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(AnalysisError::Config {
                    field: field.to_owned(),
                    reason: format!("must be within 0.0..=1.0, got {value}"),
                });
            }
        }
        if self.anomaly_weight + self.classification_weight <= 0.0 {
            return Err(AnalysisError::Config {
                field: "anomaly_weight".to_owned(),
                reason: "weights must not both be zero".to_owned(),
            });
        }
        if self.dedup_window.is_zero() {
            return Err(AnalysisError::Config {
                field: "dedup_window".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        if self.alert_history_capacity == 0 {
            return Err(AnalysisError::Config {
                field: "alert_history_capacity".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.cleanup_interval == 0 {
            return Err(AnalysisError::Config {
                field: "cleanup_interval".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let thresholds = [
            self.risk_low,
            self.risk_medium,
            self.risk_high,
            self.risk_critical,
        ];
        if thresholds.windows(2).any(|w| w[0] >= w[1])
            || thresholds.iter().any(|t| !(0.0..=1.0).contains(t))
        {
            return Err(AnalysisError::Config {
                field: "risk_thresholds".to_owned(),
                reason: "must be strictly increasing within 0.0..=1.0".to_owned(),
            });
        }
        Ok(())
    }

    /// 위험 점수를 등급으로 구간화합니다.
    pub fn risk_level_for(&self, risk_score: f64) -> RiskLevel {
        if risk_score >= self.risk_critical {
            RiskLevel::Critical
        } else if risk_score >= self.risk_high {
            RiskLevel::High
        } else if risk_score >= self.risk_medium {
            RiskLevel::Medium
        } else if risk_score >= self.risk_low {
            RiskLevel::Low
        } else {
            RiskLevel::Info
        }
    }
}
