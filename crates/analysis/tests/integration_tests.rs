//! Analysis pipeline integration tests.
//!
//! Drives the full scoring path (scorers → fusion → dedup → alerts)
//! with scripted scorers, matching how the daemon wires the pipeline.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use soctide_analysis::{fingerprint_event, AnalysisConfig, AnalysisPipeline};
use soctide_core::error::SoctideError;
use soctide_core::pipeline::{BatchProcessor, Scorer};
use soctide_core::types::{
    AlertPriority, Batch, ModelVerdict, ParsedRecord, RiskLevel, ThreatCategory,
};

/// Scores records from a fixed line → (label, anomaly score) table.
struct ScriptedScorer {
    table: HashMap<String, (String, f64)>,
}

impl ScriptedScorer {
    fn new(entries: &[(&str, &str, f64)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(line, label, score)| {
                    ((*line).to_owned(), ((*label).to_owned(), *score))
                })
                .collect(),
        }
    }
}

impl Scorer for ScriptedScorer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn score(&self, record: &ParsedRecord) -> Result<ModelVerdict, SoctideError> {
        let (label, score) = self
            .table
            .get(&record.raw_line)
            .cloned()
            .unwrap_or_else(|| ("Unknown".to_owned(), 0.0));
        Ok(ModelVerdict {
            model: "scripted".to_owned(),
            label: Some(label),
            score: Some(score),
            confidence: 0.9,
        })
    }
}

fn record(line: &str, ip: &str) -> ParsedRecord {
    ParsedRecord::from_raw_line(line, "/var/log/secure.log")
        .with_source_ip(ip.parse().unwrap())
}

#[test]
fn test_ddos_benign_benign_scenario() {
    // 60s cooldown, default floors (DDoS >= High)
    let config = AnalysisConfig {
        dedup_window: Duration::from_secs(60),
        ..AnalysisConfig::default()
    };
    let scorer = ScriptedScorer::new(&[
        ("syn flood burst", "DDoS", 0.9),
        ("routine heartbeat", "Benign", 0.05),
    ]);
    let mut pipeline = AnalysisPipeline::builder()
        .config(config)
        .scorer(Arc::new(scorer))
        .build()
        .unwrap();

    let batch = Batch::new(vec![
        record("syn flood burst", "203.0.113.9"),
        record("routine heartbeat", "203.0.113.9"),
        record("routine heartbeat", "203.0.113.9"),
    ]);
    let report = pipeline.process_batch(batch).unwrap().unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.alerts.len(), 2);
    assert_eq!(report.suppressed, 1);

    // the DDoS record escalates to at least High and bypasses dedup
    let ddos = &report.alerts[0];
    assert_eq!(ddos.threat_category, ThreatCategory::DDoS);
    assert!(ddos.risk_level >= RiskLevel::High);
    assert!(matches!(ddos.priority, AlertPriority::P1 | AlertPriority::P2));

    // the first Benign record alerts, the identical second one is deduped
    let benign = &report.alerts[1];
    assert_eq!(benign.threat_category, ThreatCategory::Benign);
    assert_eq!(benign.priority, AlertPriority::P4);
}

#[test]
fn test_killswitch_active_produces_no_alerts() {
    let active = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&active);
    let mut pipeline = AnalysisPipeline::builder()
        .scorer(Arc::new(ScriptedScorer::new(&[(
            "syn flood burst",
            "DDoS",
            0.9,
        )])))
        .killswitch(Arc::new(move || flag.load(Ordering::SeqCst)))
        .build()
        .unwrap();

    let report = pipeline
        .process_batch(Batch::new(vec![record("syn flood burst", "203.0.113.9")]))
        .unwrap();
    assert!(report.is_none());
    assert!(pipeline.latest_alerts(10).is_empty());
    assert_eq!(pipeline.stats().alerts, 0);
}

#[test]
fn test_fingerprint_bucketing_boundaries() {
    let ip: Option<IpAddr> = Some("10.0.0.1".parse().unwrap());
    // 0.123 and 0.129 share the 0.1 bucket, as does 0.13
    let a = fingerprint_event("Benign", 0.123, ip);
    assert_eq!(fingerprint_event("Benign", 0.129, ip), a);
    assert_eq!(fingerprint_event("Benign", 0.13, ip), a);
    // 0.2 lands in the next bucket
    assert_ne!(fingerprint_event("Benign", 0.2, ip), a);
}

proptest! {
    #[test]
    fn prop_fingerprint_is_deterministic(score in 0.0f64..1.0, octet in 0u8..255) {
        let ip: Option<IpAddr> = Some(format!("10.0.0.{octet}").parse().unwrap());
        let a = fingerprint_event("Benign", score, ip);
        let b = fingerprint_event("Benign", score, ip);
        prop_assert_eq!(a.as_str(), b.as_str());
        prop_assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn prop_same_bucket_same_fingerprint(bucket in 0u32..9, a_off in 0.0f64..0.0999, b_off in 0.0f64..0.0999) {
        let base = bucket as f64 / 10.0;
        let fa = fingerprint_event("Benign", base + a_off, None);
        let fb = fingerprint_event("Benign", base + b_off, None);
        prop_assert_eq!(fa, fb);
    }
}
