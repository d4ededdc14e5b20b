use crate::metrics::snapshot::MetricsSnapshot;
use crate::task::RequestResult;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

/// Live counters shared by the pipeline stages. Only used for progress
/// display; the final report is computed by the aggregator.
#[derive(Clone)]
pub struct MetricsCollector {
    tasks_queued: Arc<AtomicU64>,
    requests_completed: Arc<AtomicU64>,
    requests_failed: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            tasks_queued: Arc::new(AtomicU64::new(0)),
            requests_completed: Arc::new(AtomicU64::new(0)),
            requests_failed: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_tasks_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn request_started(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
    }

    pub fn request_finished(&self, result: &RequestResult) {
        self.requests_completed.fetch_add(1, Ordering::SeqCst);
        if result.failed {
            self.requests_failed.fetch_add(1, Ordering::SeqCst);
        }
        self.bytes_received
            .fetch_add(result.content_length, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.requests_completed.load(Ordering::SeqCst);
        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            tasks_queued: self.tasks_queued.load(Ordering::SeqCst),
            requests_completed: completed,
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            bytes_received: self.bytes_received.load(Ordering::SeqCst),
            requests_per_second: if elapsed > 0.0 {
                completed as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }
}
