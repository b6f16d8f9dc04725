//! 파일 테일러 — 단일 로그 파일의 증분 읽기
//!
//! `tail -f`와 유사하게 파일 끝에 추가되는 라인을 읽어옵니다.
//! 읽기 위치(오프셋)를 기억하고, 파일 크기가 줄어들면 로테이션으로
//! 간주하여 처음부터 다시 읽습니다.
//!
//! # 부분 라인 처리
//! 개행으로 끝나지 않은 마지막 조각은 내부에 보관했다가
//! 다음 읽기에서 이어 붙입니다. 완성된 라인만 반환됩니다.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::IngestError;

/// 단일 파일 테일링 커서
///
/// 동기 커서입니다. 컨트롤러의 리더 태스크가 폴링 주기마다
/// [`read_new_lines`](FileTailer::read_new_lines)를 호출합니다.
#[derive(Debug)]
pub struct FileTailer {
    /// 대상 파일 경로
    path: PathBuf,
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 개행으로 끝나지 않은 마지막 조각
    pending: Vec<u8>,
    /// 마지막 폴링 시점에 파일이 존재했는지 여부
    available: bool,
    /// 지금까지 읽은 라인 수
    lines_read: u64,
}

impl FileTailer {
    /// 새 테일러를 생성합니다. 오프셋 0에서 시작합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let available = path.exists();
        Self {
            path,
            offset: 0,
            pending: Vec::new(),
            available,
            lines_read: 0,
        }
    }

    /// 대상 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 읽기 오프셋을 반환합니다.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 마지막 폴링 시점에 파일이 존재했는지 여부를 반환합니다.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// 지금까지 읽은 라인 수를 반환합니다.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// 오프셋을 현재 파일 끝으로 이동합니다.
    ///
    /// 설정으로 등록된 기존 파일은 과거 내용을 건너뛰고 새로 추가되는
    /// 라인만 수집합니다. 파일이 없으면 오프셋 0을 유지합니다.
    pub fn seek_to_end(&mut self) -> Result<(), IngestError> {
        match fs::metadata(&self.path) {
            Ok(meta) => {
                self.offset = meta.len();
                self.available = true;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.available = false;
                Ok(())
            }
            Err(e) => Err(IngestError::Source {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// 마지막 읽기 이후 추가된 완성 라인을 반환합니다.
    ///
    /// - 파일이 없으면 빈 Vec을 반환하고 `available`을 내립니다.
    /// - 파일 크기가 오프셋보다 작으면 로테이션으로 간주하고
    ///   오프셋과 부분 라인을 초기화한 뒤 처음부터 읽습니다.
    /// - CR은 제거되며 빈 라인은 건너뜁니다.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>, IngestError> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.available = false;
                return Ok(Vec::new());
            }
            Err(e) => {
                self.available = false;
                return Err(IngestError::Source {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        self.available = true;

        let size = meta.len();
        if size < self.offset {
            tracing::info!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_size = size,
                "file truncated, resetting tail offset"
            );
            self.offset = 0;
            self.pending.clear();
        }
        if size == self.offset {
            return Ok(Vec::new());
        }

        let mut file = fs::File::open(&self.path).map_err(|e| IngestError::Source {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| IngestError::Source {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut chunk = Vec::new();
        let read = file
            .read_to_end(&mut chunk)
            .map_err(|e| IngestError::Source {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.offset += read as u64;

        self.pending.extend_from_slice(&chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop(); // '\n' 제거
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            let text = String::from_utf8_lossy(&line).into_owned();
            self.lines_read += 1;
            lines.push(text);
        }

        Ok(lines)
    }
}
