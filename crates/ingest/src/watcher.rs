//! 디렉토리 감시자 — 패턴에 맞는 파일의 자동 테일링
//!
//! 감시 디렉토리를 폴링하여 파일명 패턴(`*`, `?` 와일드카드)에 맞는
//! 새 파일에 테일러를 붙이고, 사라진 파일의 테일러는 유예 시간이
//! 지난 뒤 정리합니다. 감시자가 발견한 파일은 처음부터 읽습니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::IngestError;
use crate::tailer::FileTailer;

/// 감시자 상태 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStats {
    /// 지금까지 발견한 파일 수
    pub known_files: usize,
    /// 현재 활성 테일러 수
    pub active_tailers: usize,
}

/// 디렉토리 감시자
///
/// 폴링 기반으로 동작하며, 호출 측(컨트롤러 리더 태스크)이
/// 주기적으로 [`poll`](DirectoryWatcher::poll)을 호출합니다.
pub struct DirectoryWatcher {
    /// 감시 대상 디렉토리
    dir: PathBuf,
    /// 파일명 패턴
    pattern: String,
    /// 사라진 파일의 테일러 정리 유예 시간
    grace_period: Duration,
    /// 경로별 활성 테일러
    tailers: HashMap<PathBuf, FileTailer>,
    /// 사라진 파일의 최초 감지 시각
    missing_since: HashMap<PathBuf, Instant>,
    /// 지금까지 발견한 파일 수
    discovered: usize,
}

impl DirectoryWatcher {
    /// 새 감시자를 생성합니다.
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>, grace_period: Duration) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
            grace_period,
            tailers: HashMap::new(),
            missing_since: HashMap::new(),
            discovered: 0,
        }
    }

    /// 감시 대상 디렉토리를 반환합니다.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 감시자 상태 스냅샷을 반환합니다.
    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            known_files: self.discovered,
            active_tailers: self.tailers.len(),
        }
    }

    /// 디렉토리를 한 번 폴링합니다.
    ///
    /// 새로 발견된 파일에 테일러를 붙이고, 모든 활성 테일러에서
    /// 새 라인을 수집하여 파일별로 반환합니다. 디렉토리 자체가 없으면
    /// 빈 결과를 반환합니다 (일시적 상황으로 간주).
    pub fn poll(&mut self) -> Result<Vec<(PathBuf, Vec<String>)>, IngestError> {
        self.discover_new_files()?;

        let now = Instant::now();
        let mut collected = Vec::new();
        let mut retired = Vec::new();

        for (path, tailer) in &mut self.tailers {
            let lines = tailer.read_new_lines()?;
            if tailer.is_available() {
                self.missing_since.remove(path);
            } else {
                let since = self.missing_since.entry(path.clone()).or_insert(now);
                if now.duration_since(*since) >= self.grace_period {
                    retired.push(path.clone());
                    continue;
                }
            }
            if !lines.is_empty() {
                collected.push((path.clone(), lines));
            }
        }

        for path in retired {
            self.tailers.remove(&path);
            self.missing_since.remove(&path);
            tracing::info!(path = %path.display(), "retired tailer for missing file");
        }

        Ok(collected)
    }

    fn discover_new_files(&mut self) -> Result<(), IngestError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(IngestError::Watch {
                    dir: self.dir.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| IngestError::Watch {
                dir: self.dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !wildcard_match(&self.pattern, name) {
                continue;
            }
            if !self.tailers.contains_key(&path) {
                tracing::info!(path = %path.display(), "discovered new file, attaching tailer");
                self.tailers.insert(path.clone(), FileTailer::new(&path));
                self.discovered += 1;
            }
        }
        Ok(())
    }
}

/// `*`(임의 길이), `?`(한 글자) 와일드카드 매칭
///
/// 파일명 단위 매칭만 지원하며 경로 구분자는 고려하지 않습니다.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = name.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            // 마지막 '*'가 한 글자 더 삼키도록 백트래킹
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn wildcard_match_basics() {
        assert!(wildcard_match("*.log", "auth.log"));
        assert!(wildcard_match("*.log", ".log"));
        assert!(!wildcard_match("*.log", "auth.txt"));
        assert!(wildcard_match("access?.log", "access1.log"));
        assert!(!wildcard_match("access?.log", "access10.log"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("a*b*c", "a-xx-b-yy-c"));
        assert!(!wildcard_match("a*b*c", "a-xx-c"));
        assert!(wildcard_match("exact.log", "exact.log"));
        assert!(!wildcard_match("exact.log", "exact.log.1"));
    }

    #[test]
    fn discovers_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "first\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path(), "*.log", Duration::from_secs(30));
        let collected = watcher.poll().unwrap();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].1, vec!["first"]);
        assert_eq!(watcher.stats().active_tailers, 1);
        assert_eq!(watcher.stats().known_files, 1);
    }

    #[test]
    fn picks_up_files_created_after_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = DirectoryWatcher::new(dir.path(), "*.log", Duration::from_secs(30));
        assert!(watcher.poll().unwrap().is_empty());

        fs::write(dir.path().join("late.log"), "late line\n").unwrap();
        let collected = watcher.poll().unwrap();
        assert_eq!(collected.len(), 1);
        // 감시자가 발견한 파일은 처음부터 읽음
        assert_eq!(collected[0].1, vec!["late line"]);
    }

    #[test]
    fn retires_tailer_after_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.log");
        fs::write(&path, "only line\n").unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path(), "*.log", Duration::from_millis(0));
        watcher.poll().unwrap();
        assert_eq!(watcher.stats().active_tailers, 1);

        fs::remove_file(&path).unwrap();
        // 유예 시간 0이므로 다음 폴링에서 정리됨
        watcher.poll().unwrap();
        watcher.poll().unwrap();
        assert_eq!(watcher.stats().active_tailers, 0);
    }

    #[test]
    fn keeps_tailer_within_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flaky.log");
        fs::write(&path, "line\n").unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path(), "*.log", Duration::from_secs(60));
        watcher.poll().unwrap();
        fs::remove_file(&path).unwrap();
        watcher.poll().unwrap();
        // 유예 시간 내에는 테일러 유지
        assert_eq!(watcher.stats().active_tailers, 1);
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("not-yet");
        let mut watcher = DirectoryWatcher::new(&nested, "*.log", Duration::from_secs(30));
        assert!(watcher.poll().unwrap().is_empty());
    }
}
