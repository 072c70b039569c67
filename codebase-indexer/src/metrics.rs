use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
struct Inner {
    files_indexed: usize,
    files_skipped: usize,
    files_errored: usize,
    chunks_created: usize,
    retries: usize,
    started: Instant,
    total_duration: Duration,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            files_indexed: 0,
            files_skipped: 0,
            files_errored: 0,
            chunks_created: 0,
            retries: 0,
            started: Instant::now(),
            total_duration: Duration::ZERO,
        }
    }
}

/// Counters for one top-level index run. Reset at the start of each run,
/// logged as a single summary line when it finishes.
#[derive(Debug, Default)]
pub struct IndexMetrics {
    inner: Mutex<Inner>,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_errored: usize,
    pub chunks_created: usize,
    pub retries: usize,
    pub total_duration_ms: u128,
}

impl IndexMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.inner.lock().expect("metrics lock") = Inner::default();
    }

    pub fn record_file(&self, indexed: bool, errored: bool) {
        let mut inner = self.inner.lock().expect("metrics lock");
        if errored {
            inner.files_errored += 1;
        } else if indexed {
            inner.files_indexed += 1;
        } else {
            inner.files_skipped += 1;
        }
    }

    pub fn record_chunks(&self, count: usize) {
        self.inner.lock().expect("metrics lock").chunks_created += count;
    }

    pub fn record_retry(&self) {
        self.inner.lock().expect("metrics lock").retries += 1;
    }

    pub fn finish(&self) {
        let mut inner = self.inner.lock().expect("metrics lock");
        inner.total_duration = inner.started.elapsed();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics lock");
        MetricsSnapshot {
            files_indexed: inner.files_indexed,
            files_skipped: inner.files_skipped,
            files_errored: inner.files_errored,
            chunks_created: inner.chunks_created,
            retries: inner.retries,
            total_duration_ms: inner.total_duration.as_millis(),
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            files_indexed = snapshot.files_indexed,
            files_skipped = snapshot.files_skipped,
            files_errored = snapshot.files_errored,
            chunks_created = snapshot.chunks_created,
            retries = snapshot.retries,
            duration_ms = snapshot.total_duration_ms as u64,
            "indexing metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_accumulate_and_reset() {
        let metrics = IndexMetrics::new();
        metrics.record_file(true, false);
        metrics.record_file(false, false);
        metrics.record_file(false, true);
        metrics.record_chunks(7);
        metrics.record_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_indexed, 1);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.files_errored, 1);
        assert_eq!(snapshot.chunks_created, 7);
        assert_eq!(snapshot.retries, 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
