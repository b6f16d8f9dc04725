//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 수집 계층, 판단 계층, 거버넌스 계층이 공유하는 데이터 구조를 정의합니다.
//! 레코드는 배치로 묶여 전달되고, 판단 결과는 [`EnsembleResult`]와
//! [`Alert`]로 표현됩니다.

use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 파싱된 로그 레코드
///
/// 수집 계층이 로그 파일에서 읽은 한 줄을 나타냅니다.
/// 생성 이후에는 수정하지 않습니다. 형식별 파싱은 수집 범위 밖이므로
/// `fields`는 호출 측이 선택적으로 채우는 확장 슬롯입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRecord {
    /// 원본 로그 라인
    pub raw_line: String,
    /// 레코드 타임스탬프 (없으면 수집 시각으로 대체)
    pub timestamp: Option<SystemTime>,
    /// 수집 소스 (파일 경로 또는 소스 ID)
    pub source: String,
    /// 관련 출발지 IP (파싱된 경우)
    pub source_ip: Option<IpAddr>,
    /// 추가 필드 (key-value 쌍)
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ParsedRecord {
    /// 원시 라인에서 레코드를 생성합니다. 수집 시각을 타임스탬프로 기록합니다.
    pub fn from_raw_line(raw_line: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            raw_line: raw_line.into(),
            timestamp: Some(SystemTime::now()),
            source: source.into(),
            source_ip: None,
            fields: serde_json::Map::new(),
        }
    }

    /// 출발지 IP를 설정합니다.
    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.source,
            &self.raw_line[..80.min(self.raw_line.len())],
        )
    }
}

/// 마이크로 배치
///
/// 버퍼 드레인 시점에 생성되어 판단 계층으로 한 번만 전달됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// 배치 고유 ID (UUID v4)
    pub batch_id: String,
    /// 배치 생성 시각
    pub created_at: SystemTime,
    /// 배치에 포함된 레코드
    pub records: Vec<ParsedRecord>,
}

impl Batch {
    /// 레코드 목록으로 새 배치를 생성합니다.
    pub fn new(records: Vec<ParsedRecord>) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            created_at: SystemTime::now(),
            records,
        }
    }

    /// 배치에 포함된 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 빈 배치인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch[{}] records={}",
            &self.batch_id[..8.min(self.batch_id.len())],
            self.records.len(),
        )
    }
}

/// 위험도 레벨
///
/// 융합된 위험 점수를 구간으로 나눈 등급입니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskLevel {
    /// 정보성
    #[default]
    Info,
    /// 낮음
    Low,
    /// 중간
    Medium,
    /// 높음
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl RiskLevel {
    /// 문자열에서 위험도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 알림 우선순위
///
/// P1이 가장 긴급하며 P4는 정보성입니다. P1~P3는 중복 제거를 우회하고
/// 항상 알림을 생성합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertPriority {
    /// 최고 긴급 — 치명적 위험
    P1,
    /// 높은 긴급
    P2,
    /// 중간 긴급
    P3,
    /// 정보성 — 중복 제거 대상
    P4,
}

impl AlertPriority {
    /// 위험도 레벨을 우선순위로 매핑합니다.
    pub fn from_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical => Self::P1,
            RiskLevel::High => Self::P2,
            RiskLevel::Medium => Self::P3,
            RiskLevel::Low | RiskLevel::Info => Self::P4,
        }
    }

    /// P1~P3 여부 — 즉시 알림 대상인지 확인합니다.
    pub fn is_alert_worthy(&self) -> bool {
        !matches!(self, Self::P4)
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P1 => write!(f, "P1-Critical"),
            Self::P2 => write!(f, "P2-High"),
            Self::P3 => write!(f, "P3-Medium"),
            Self::P4 => write!(f, "P4-Info"),
        }
    }
}

/// 위협 분류
///
/// 분류 스코어러의 레이블을 정규화한 범주입니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ThreatCategory {
    /// 정상 트래픽
    Benign,
    /// 분산 서비스 거부
    DDoS,
    /// 무차별 대입 공격
    BruteForce,
    /// 악성코드
    Malware,
    /// 데이터 유출
    Exfiltration,
    /// 분류 불가
    #[default]
    Unknown,
}

impl ThreatCategory {
    /// 분류 레이블 문자열을 범주로 매핑합니다.
    ///
    /// 대소문자, 구분자 차이를 허용합니다. 알 수 없는 레이블은 `Unknown`입니다.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "benign" | "normal" => Self::Benign,
            "ddos" | "dos" => Self::DDoS,
            "bruteforce" => Self::BruteForce,
            "malware" | "botnet" | "trojan" => Self::Malware,
            "exfiltration" | "infiltration" | "dataexfiltration" => Self::Exfiltration,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benign => write!(f, "Benign"),
            Self::DDoS => write!(f, "DDoS"),
            Self::BruteForce => write!(f, "BruteForce"),
            Self::Malware => write!(f, "Malware"),
            Self::Exfiltration => write!(f, "Exfiltration"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// 스코어러 출력
///
/// 개별 스코어러의 결과를 정규화한 형태입니다. 분류 모델은 `label`을,
/// 이상 탐지 모델은 `score`를 채웁니다. 둘 다 채울 수도 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVerdict {
    /// 스코어러 이름
    pub model: String,
    /// 분류 레이블 (분류 모델일 경우)
    pub label: Option<String>,
    /// 이상 점수 0.0~1.0 (이상 탐지 모델일 경우)
    pub score: Option<f64>,
    /// 결과 신뢰도 0.0~1.0
    pub confidence: f64,
}

impl ModelVerdict {
    /// 분류 결과를 생성합니다.
    pub fn classification(
        model: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            model: model.into(),
            label: Some(label.into()),
            score: None,
            confidence,
        }
    }

    /// 이상 점수 결과를 생성합니다.
    pub fn anomaly(model: impl Into<String>, score: f64, confidence: f64) -> Self {
        Self {
            model: model.into(),
            label: None,
            score: Some(score),
            confidence,
        }
    }
}

/// 앙상블 융합 결과
///
/// 한 레코드에 대한 모든 스코어러 출력을 융합한 최종 판단입니다.
/// 생성 이후에는 수정하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// 최종 분류 레이블
    pub classification: String,
    /// 정규화된 위협 범주
    pub threat_category: ThreatCategory,
    /// 융합된 이상 점수 0.0~1.0
    pub anomaly_score: f64,
    /// 융합된 위험 점수 0.0~1.0
    pub risk_score: f64,
    /// 위험 점수를 구간화한 등급
    pub risk_level: RiskLevel,
    /// 등급에서 유도된 우선순위
    pub priority: AlertPriority,
    /// 융합에 기여한 개별 결과
    pub contributions: Vec<ModelVerdict>,
}

impl fmt::Display for EnsembleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} risk={:.3} level={} priority={}",
            self.classification, self.risk_score, self.risk_level, self.priority,
        )
    }
}

/// 알림 상태
///
/// 알림은 삭제되지 않고 상태 전이만 합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    /// 새로 생성됨
    #[default]
    New,
    /// 운영자가 확인함
    Acknowledged,
    /// 오버라이드로 억제됨
    Suppressed,
    /// 처리 완료
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Acknowledged => write!(f, "Acknowledged"),
            Self::Suppressed => write!(f, "Suppressed"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

/// 보안 알림
///
/// 판단 계층이 융합 결과에서 생성하는 최종 산출물입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (UUID v4)
    pub alert_id: String,
    /// 생성 시각
    pub created_at: SystemTime,
    /// 우선순위
    pub priority: AlertPriority,
    /// 분류 레이블
    pub classification: String,
    /// 위협 범주
    pub threat_category: ThreatCategory,
    /// 위험도 등급
    pub risk_level: RiskLevel,
    /// 이상 점수
    pub anomaly_score: f64,
    /// 관련 출발지 IP (있을 경우)
    pub source_ip: Option<IpAddr>,
    /// MITRE ATT&CK 기법 ID 주석
    pub mitre_techniques: Vec<String>,
    /// 알림 상태
    pub status: AlertStatus,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} score={:.3}",
            self.priority, self.classification, self.risk_level, self.anomaly_score,
        )
    }
}

/// 버퍼 통계
///
/// 마이크로 배치 버퍼의 현재 상태 스냅샷입니다.
/// `dropped_count`는 명시적 리셋 외에는 단조 증가합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    /// 현재 버퍼에 있는 레코드 수
    pub size: usize,
    /// 버퍼 최대 용량
    pub max_size: usize,
    /// 오버플로로 버려진 레코드 누적 수
    pub dropped_count: u64,
    /// 오버플로 경고 발생 누적 수
    pub overflow_warnings: u64,
}

impl fmt::Display for BufferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} dropped={}",
            self.size, self.max_size, self.dropped_count,
        )
    }
}
