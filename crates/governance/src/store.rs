//! 스토어 파일 입출력 헬퍼
//!
//! 거버넌스 상태 파일은 모두 단일 디렉토리 아래의 JSON 파일입니다.
//! 쓰기는 임시 파일에 기록한 뒤 원자적 rename으로 교체하여, 다른
//! 프로세스 인스턴스가 절반만 쓰인 파일을 읽는 일을 방지합니다.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::GovernanceError;

/// JSON 문서를 원자적으로 기록합니다 (임시 파일 + rename).
pub(crate) fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), GovernanceError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| GovernanceError::Unavailable {
        path: path.display().to_string(),
        reason: format!("serialize failed: {e}"),
    })?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| GovernanceError::Unavailable {
        path: tmp.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::rename(&tmp, path).map_err(|e| GovernanceError::Unavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// JSON 문서를 읽습니다. 파일이 없으면 `Ok(None)`을 반환합니다.
///
/// 파싱 실패는 손상으로 간주하며 치명적 에러입니다.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, GovernanceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GovernanceError::Unavailable {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| GovernanceError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            name: "x".to_owned(),
            count: 3,
        };
        write_json_atomic(&path, &doc).unwrap();
        let loaded: Option<Doc> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(doc));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Doc> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<Option<Doc>, _> = read_json(&path);
        assert!(matches!(result, Err(GovernanceError::Corrupt { .. })));
    }

    #[test]
    fn write_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json_atomic(
            &path,
            &Doc {
                name: "y".to_owned(),
                count: 1,
            },
        )
        .unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
