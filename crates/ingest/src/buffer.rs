//! 마이크로 배치 버퍼 — 인메모리 버퍼링 및 배치 플러시
//!
//! [`MicroBatchBuffer`]는 수집된 레코드를 인메모리에 모았다가
//! 크기 또는 시간 조건이 충족되면 배치로 플러시합니다.
//!
//! # 오버플로우 정책
//! 버퍼가 가득 차면 새 유입을 거부합니다 (drop-newest).
//! 버려진 레코드 수는 [`BufferStats::dropped_count`]로 집계되며
//! 명시적 [`reset_counters`](MicroBatchBuffer::reset_counters) 외에는
//! 감소하지 않습니다.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use soctide_core::types::{BufferStats, ParsedRecord};

/// 인메모리 마이크로 배치 버퍼
///
/// 단일 소유자가 `Arc<Mutex<_>>`로 감싸 리더 태스크와 드레인 태스크가
/// 공유합니다. 내부는 동기 로직만 포함합니다.
pub struct MicroBatchBuffer {
    /// 버퍼 내부 저장소
    buffer: VecDeque<ParsedRecord>,
    /// 최대 용량
    max_size: usize,
    /// 오버플로로 버려진 레코드 누적 수
    dropped_count: u64,
    /// 오버플로 경고 발생 누적 수
    overflow_warnings: u64,
    /// 마지막 플러시 시각
    last_flush: Instant,
}

impl MicroBatchBuffer {
    /// 새 버퍼를 생성합니다.
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_size.min(10_000)),
            max_size,
            dropped_count: 0,
            overflow_warnings: 0,
            last_flush: Instant::now(),
        }
    }

    /// 레코드를 버퍼에 추가합니다.
    ///
    /// 버퍼가 가득 차면 새 레코드를 거부하고 `false`를 반환합니다.
    pub fn add(&mut self, record: ParsedRecord) -> bool {
        if self.buffer.len() >= self.max_size {
            self.dropped_count += 1;
            self.overflow_warnings += 1;
            tracing::warn!(
                dropped = self.dropped_count,
                capacity = self.max_size,
                "buffer full, rejected new record"
            );
            return false;
        }
        self.buffer.push_back(record);
        true
    }

    /// 버퍼의 모든 레코드를 드레인하고 플러시 시각을 갱신합니다.
    pub fn flush(&mut self) -> Vec<ParsedRecord> {
        self.last_flush = Instant::now();
        self.buffer.drain(..).collect()
    }

    /// 버퍼를 비웁니다. 카운터는 유지됩니다.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_flush = Instant::now();
    }

    /// 현재 버퍼에 저장된 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 버퍼 상태 스냅샷을 반환합니다.
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            size: self.buffer.len(),
            max_size: self.max_size,
            dropped_count: self.dropped_count,
            overflow_warnings: self.overflow_warnings,
        }
    }

    /// 배치 플러시 조건을 확인합니다.
    ///
    /// 버퍼가 가득 찼거나, 마지막 플러시 이후 `interval`이 경과했고
    /// 버퍼가 비어있지 않으면 `true`를 반환합니다.
    pub fn should_flush(&self, interval: Duration) -> bool {
        if self.buffer.len() >= self.max_size {
            return true;
        }
        !self.buffer.is_empty() && self.last_flush.elapsed() >= interval
    }

    /// 드롭 카운터를 리셋합니다.
    ///
    /// 카운터가 감소하는 유일한 경로입니다. 운영자 조회 후
    /// 명시적으로만 호출됩니다.
    pub fn reset_counters(&mut self) {
        self.dropped_count = 0;
        self.overflow_warnings = 0;
    }

    /// 버퍼 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.buffer.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.max_size).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(msg: &str) -> ParsedRecord {
        ParsedRecord::from_raw_line(msg, "test")
    }

    #[test]
    fn add_and_flush() {
        let mut buf = MicroBatchBuffer::new(100);
        assert!(buf.add(make_record("log1")));
        assert!(buf.add(make_record("log2")));
        assert_eq!(buf.len(), 2);

        let flushed = buf.flush();
        assert_eq!(flushed.len(), 2);
        assert!(buf.is_empty());
        assert_eq!(flushed[0].raw_line, "log1");
    }

    #[test]
    fn rejects_when_full() {
        let mut buf = MicroBatchBuffer::new(2);
        assert!(buf.add(make_record("log1")));
        assert!(buf.add(make_record("log2")));

        // 3번째는 거부됨
        assert!(!buf.add(make_record("log3")));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.stats().dropped_count, 1);
        assert_eq!(buf.stats().overflow_warnings, 1);
    }

    #[test]
    fn size_never_exceeds_max() {
        let mut buf = MicroBatchBuffer::new(5);
        for i in 0..20 {
            buf.add(make_record(&format!("log{i}")));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.stats().dropped_count, 15);
    }

    #[test]
    fn flush_makes_room_again() {
        let mut buf = MicroBatchBuffer::new(2);
        buf.add(make_record("a"));
        buf.add(make_record("b"));
        buf.add(make_record("c")); // dropped

        buf.flush();
        assert!(buf.add(make_record("d")));
        // 드롭 카운터는 플러시로 초기화되지 않음
        assert_eq!(buf.stats().dropped_count, 1);
    }

    #[test]
    fn clear_keeps_counters() {
        let mut buf = MicroBatchBuffer::new(1);
        buf.add(make_record("a"));
        buf.add(make_record("b")); // dropped
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.stats().dropped_count, 1);
    }

    #[test]
    fn reset_counters_is_the_only_way_down() {
        let mut buf = MicroBatchBuffer::new(1);
        buf.add(make_record("a"));
        buf.add(make_record("b"));
        buf.add(make_record("c"));
        assert_eq!(buf.stats().dropped_count, 2);

        buf.reset_counters();
        assert_eq!(buf.stats().dropped_count, 0);
        assert_eq!(buf.stats().overflow_warnings, 0);
    }

    #[test]
    fn warnings_mirror_drops() {
        let mut buf = MicroBatchBuffer::new(1);
        buf.add(make_record("a"));
        for i in 0..7 {
            buf.add(make_record(&format!("x{i}")));
        }
        let stats = buf.stats();
        assert_eq!(stats.dropped_count, stats.overflow_warnings);
    }

    #[test]
    fn should_flush_on_size() {
        let mut buf = MicroBatchBuffer::new(3);
        assert!(!buf.should_flush(Duration::from_secs(3600)));
        buf.add(make_record("a"));
        buf.add(make_record("b"));
        assert!(!buf.should_flush(Duration::from_secs(3600)));
        buf.add(make_record("c"));
        assert!(buf.should_flush(Duration::from_secs(3600)));
    }

    #[test]
    fn should_flush_on_elapsed_time() {
        let mut buf = MicroBatchBuffer::new(100);
        buf.add(make_record("a"));
        assert!(!buf.should_flush(Duration::from_secs(3600)));
        // 경과 시간 0이면 비어있지 않은 버퍼는 즉시 플러시 대상
        assert!(buf.should_flush(Duration::from_millis(0)));
    }

    #[test]
    fn empty_buffer_never_time_flushes() {
        let buf = MicroBatchBuffer::new(100);
        assert!(!buf.should_flush(Duration::from_millis(0)));
    }

    #[test]
    fn utilization_calculation() {
        let mut buf = MicroBatchBuffer::new(100);
        assert_eq!(buf.utilization(), 0.0);
        for i in 0..50 {
            buf.add(make_record(&format!("log{i}")));
        }
        let util = buf.utilization();
        assert!(util > 0.49 && util < 0.51);
    }
}
