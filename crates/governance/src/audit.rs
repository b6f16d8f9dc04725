//! 감사 로그 — 추가 전용 JSON 라인 기록
//!
//! 모든 거버넌스 상태 변화는 `audit.log`에 한 줄씩 기록됩니다.
//! 수정이나 삭제 API는 존재하지 않습니다. 잘못 적용된 조치의 취소도
//! 기존 기록을 고치지 않고 보상 이벤트를 추가하는 방식으로 남깁니다.
//!
//! 읽기 중 파싱할 수 없는 라인을 만나면 손상으로 간주하고 치명적
//! 에러를 반환합니다.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// 감사 로그 파일명
pub const AUDIT_FILE: &str = "audit.log";

/// 감사 이벤트 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// 이벤트 ID (UUID v4)
    pub event_id: String,
    /// 기록 시각
    pub timestamp: DateTime<Utc>,
    /// 수행 주체 (운영자 ID 또는 "system")
    pub actor: String,
    /// 수행한 동작 (예: "killswitch.activate")
    pub action: String,
    /// 동작 상세
    pub detail: String,
    /// 결과 (예: "ok", "refused")
    pub outcome: String,
}

/// 이벤트 조회 필터
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// 주체 필터
    pub actor: Option<String>,
    /// 동작 필터
    pub action: Option<String>,
    /// 최근 N건 제한
    pub limit: Option<usize>,
}

/// 추가 전용 감사 로거
pub struct AuditLogger {
    /// 감사 로그 파일 경로
    path: PathBuf,
}

impl AuditLogger {
    /// 스토어 디렉토리 기준으로 감사 로거를 생성합니다.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            path: store_dir.as_ref().join(AUDIT_FILE),
        }
    }

    /// 감사 이벤트를 한 건 기록합니다.
    ///
    /// JSON 한 줄을 추가하고 즉시 플러시합니다.
    pub fn log_event(
        &self,
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Result<AuditEvent, GovernanceError> {
        let event = AuditEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            detail: detail.into(),
            outcome: outcome.into(),
        };

        let line = serde_json::to_string(&event).map_err(|e| GovernanceError::Unavailable {
            path: self.path.display().to_string(),
            reason: format!("serialize failed: {e}"),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GovernanceError::Unavailable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        writeln!(file, "{line}").map_err(|e| GovernanceError::Unavailable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        file.flush().map_err(|e| GovernanceError::Unavailable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            actor = event.actor.as_str(),
            action = event.action.as_str(),
            outcome = event.outcome.as_str(),
            "audit event recorded"
        );
        Ok(event)
    }

    /// 감사 이벤트를 조회합니다. 기록 순서를 유지합니다.
    ///
    /// `limit`은 필터링된 결과 중 최근 N건을 의미합니다.
    pub fn events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, GovernanceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GovernanceError::Unavailable {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut events = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent =
                serde_json::from_str(line).map_err(|e| GovernanceError::Corrupt {
                    path: self.path.display().to_string(),
                    reason: format!("line {}: {e}", lineno + 1),
                })?;
            if let Some(actor) = &filter.actor {
                if &event.actor != actor {
                    continue;
                }
            }
            if let Some(action) = &filter.action {
                if &event.action != action {
                    continue;
                }
            }
            events.push(event);
        }

        if let Some(limit) = filter.limit {
            if events.len() > limit {
                events.drain(..events.len() - limit);
            }
        }
        Ok(events)
    }
}
