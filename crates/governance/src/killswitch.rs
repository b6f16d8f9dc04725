//! 킬 스위치 — 마커 파일 기반 긴급 정지
//!
//! `killswitch.json` 파일의 존재 자체가 활성 상태입니다. 상태는
//! 디스크에만 있으며 인메모리 캐싱을 하지 않으므로, 다른 프로세스
//! 인스턴스가 활성화한 스위치도 다음 조회에서 즉시 보입니다.
//! 파일을 외부에서 직접 만들거나 지워도 동일하게 동작합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soctide_core::pipeline::KillswitchProbe;

use crate::error::GovernanceError;
use crate::store::{read_json, write_json_atomic};

/// 마커 파일명
pub const KILLSWITCH_FILE: &str = "killswitch.json";

/// 킬 스위치 활성 상태 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchState {
    /// 활성화 시각
    pub activated_at: DateTime<Utc>,
    /// 활성화 사유
    pub reason: String,
}

/// 마커 파일 기반 킬 스위치
pub struct KillSwitch {
    /// 마커 파일 경로
    path: PathBuf,
}

impl KillSwitch {
    /// 스토어 디렉토리 기준으로 킬 스위치를 생성합니다.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            path: store_dir.as_ref().join(KILLSWITCH_FILE),
        }
    }

    /// 킬 스위치를 활성화합니다.
    ///
    /// 이미 활성 상태면 아무것도 하지 않고 `false`를 반환합니다.
    pub fn activate(&self, reason: impl Into<String>) -> Result<bool, GovernanceError> {
        if self.is_active() {
            return Ok(false);
        }
        let state = KillSwitchState {
            activated_at: Utc::now(),
            reason: reason.into(),
        };
        write_json_atomic(&self.path, &state)?;
        tracing::warn!(reason = state.reason.as_str(), "killswitch activated");
        Ok(true)
    }

    /// 킬 스위치를 비활성화합니다.
    ///
    /// 이미 비활성 상태면 아무것도 하지 않고 `false`를 반환합니다.
    pub fn deactivate(&self) -> Result<bool, GovernanceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::warn!("killswitch deactivated");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GovernanceError::Unavailable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// 현재 활성 여부를 조회합니다.
    ///
    /// 호출마다 파일 시스템을 확인합니다. 캐싱하지 않습니다.
    pub fn is_active(&self) -> bool {
        self.path.exists()
    }

    /// 활성 상태 기록을 읽습니다.
    ///
    /// 비활성이면 `Ok(None)`, 마커 파일 본문이 손상되었으면 치명적
    /// 에러를 반환합니다.
    pub fn state(&self) -> Result<Option<KillSwitchState>, GovernanceError> {
        read_json(&self.path)
    }

    /// 수집/판단 계층에 전달할 조회 클로저를 생성합니다.
    pub fn probe(&self) -> KillswitchProbe {
        let path = self.path.clone();
        Arc::new(move || path.exists())
    }
}
