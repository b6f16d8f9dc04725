//! Stand-in scorers wired into the `Scorer` seam.
//!
//! The daemon runs end-to-end without the external ML collaborators
//! by shipping two heuristic scorers: a keyword classifier and a
//! line-length anomaly detector. Real model backends plug into the
//! same seam.

use soctide_core::error::SoctideError;
use soctide_core::pipeline::Scorer;
use soctide_core::types::{ModelVerdict, ParsedRecord};

/// Keyword-based classifier.
///
/// Scans the raw line for known attack keywords and emits the label
/// of the first matching rule. Confidence grows with the number of
/// matching keywords for that rule.
pub struct KeywordScorer {
    rules: Vec<(&'static str, &'static [&'static str])>,
}

impl KeywordScorer {
    /// Create the classifier with the built-in rule table.
    pub fn new() -> Self {
        Self {
            rules: vec![
                (
                    "BruteForce",
                    &["failed password", "authentication failure", "invalid user"],
                ),
                ("DDoS", &["syn flood", "connection flood", "rate limit exceeded"]),
                ("Malware", &["trojan", "dropper", "malicious payload"]),
                ("Exfiltration", &["data transfer anomaly", "exfil", "unusual upload"]),
            ],
        }
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for KeywordScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    fn score(&self, record: &ParsedRecord) -> Result<ModelVerdict, SoctideError> {
        let line = record.raw_line.to_lowercase();
        for (label, keywords) in &self.rules {
            let hits = keywords.iter().filter(|k| line.contains(**k)).count();
            if hits > 0 {
                let confidence = (0.6 + 0.15 * hits as f64).min(0.95);
                return Ok(ModelVerdict::classification("keyword", *label, confidence));
            }
        }
        Ok(ModelVerdict::classification("keyword", "Benign", 0.5))
    }
}

/// Line-length anomaly detector.
///
/// Log lines far longer or shorter than the expected baseline score
/// higher. Crude, but enough to exercise the anomaly side of the
/// fusion.
pub struct LengthAnomalyScorer {
    baseline: f64,
    scale: f64,
}

impl LengthAnomalyScorer {
    /// Create a detector with the given expected line length and
    /// deviation scale.
    pub fn new(baseline: usize, scale: usize) -> Self {
        Self {
            baseline: baseline as f64,
            scale: scale.max(1) as f64,
        }
    }
}

impl Default for LengthAnomalyScorer {
    fn default() -> Self {
        Self::new(120, 240)
    }
}

impl Scorer for LengthAnomalyScorer {
    fn name(&self) -> &str {
        "length-anomaly"
    }

    fn score(&self, record: &ParsedRecord) -> Result<ModelVerdict, SoctideError> {
        let deviation = (record.raw_line.len() as f64 - self.baseline).abs();
        let score = (deviation / self.scale).clamp(0.0, 1.0);
        Ok(ModelVerdict::anomaly("length-anomaly", score, 0.6))
    }
}
