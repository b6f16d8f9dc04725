//! 저위험 이벤트 중복 제거
//!
//! 지문은 분류 레이블, 0.1 단위로 버킷화한 점수, 출발지 IP에서
//! 결정적으로 계산합니다. 같은 지문이 쿨다운 윈도우 안에서 다시
//! 보이면 억제합니다. 윈도우는 슬라이딩이며, 타임스탬프는 통과한
//! (`true`) 경우에만 갱신됩니다 — 억제된 이벤트가 윈도우를 연장하지
//! 않습니다.
//!
//! 상태는 프로세스 수명 동안만 유지하며 영속하지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// 이벤트 지문 — SHA-256 앞 16 hex 문자
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// 지문 문자열
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 이벤트 지문을 계산합니다. 순수 함수입니다.
///
/// 점수는 0.1 단위로 내림 버킷화하므로 0.123과 0.129는 같은
/// 지문을, 0.13은 (0.1 버킷이므로 역시 같은) 지문을 공유하고
/// 0.19와 0.20은 다른 지문을 가집니다. IP가 없으면 `"unknown"`을
/// 사용합니다.
pub fn fingerprint_event(classification: &str, score: f64, ip: Option<IpAddr>) -> Fingerprint {
    let bucket = (score * 10.0).floor() / 10.0;
    let ip_part = ip.map_or_else(|| "unknown".to_owned(), |ip| ip.to_string());
    let input = format!("{classification}|{bucket:.1}|{ip_part}");

    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    Fingerprint(hex[..16].to_owned())
}

/// 슬라이딩 쿨다운 기반 중복 제거기
pub struct EventDeduplicator {
    window: Duration,
    seen: HashMap<Fingerprint, Instant>,
}

impl EventDeduplicator {
    /// 쿨다운 윈도우로 중복 제거기를 생성합니다.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// 지문이 처리 대상인지 판정합니다.
    ///
    /// 윈도우 밖이면 `true`를 반환하고 타임스탬프를 갱신합니다.
    /// 윈도우 안이면 `false`를 반환하며 타임스탬프를 건드리지 않습니다.
    pub fn should_process(&mut self, fingerprint: &Fingerprint) -> bool {
        self.should_process_at(fingerprint, Instant::now())
    }

    /// 추적 중인 지문 수
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// 추적 중인 지문이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// 오래된 엔트리를 제거합니다.
    pub fn cleanup_old_entries(&mut self, max_age: Duration) {
        let now = Instant::now();
        let before = self.seen.len();
        self.seen
            .retain(|_, last| now.duration_since(*last) < max_age);
        let removed = before - self.seen.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.seen.len(), "dedup entries cleaned");
        }
    }

    /// 모든 지문을 잊습니다. 재분석 강제에 사용합니다.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    // 시간 주입 가능한 내부 판정. 테스트에서 직접 호출합니다.
    fn should_process_at(&mut self, fingerprint: &Fingerprint, now: Instant) -> bool {
        if let Some(last) = self.seen.get(fingerprint) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.seen.insert(fingerprint.clone(), now);
        true
    }
}
