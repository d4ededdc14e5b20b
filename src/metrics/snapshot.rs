use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tasks_queued: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
    pub bytes_received: u64,
    pub requests_per_second: f64,
    pub elapsed_seconds: f64,
}
