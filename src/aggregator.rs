use crate::output::ResultWriter;
use crate::task::{Category, RequestResult};
use std::time::Duration;
use tokio::sync::mpsc;

/// Running statistics for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub count_success: u64,
    pub count_failed: u64,
    pub count_http_error: u64,
    pub total_bytes: u64,
    pub total_duration: Duration,
    /// `None` until the first result arrives.
    pub min_duration: Option<Duration>,
    pub max_duration: Duration,
}

impl CategoryStats {
    pub fn record(&mut self, result: &RequestResult) {
        if result.failed {
            self.count_failed += 1;
        } else if result.status_code == Some(200) {
            self.count_success += 1;
        } else {
            self.count_http_error += 1;
        }

        self.total_bytes += result.content_length;
        self.total_duration += result.duration;
        self.min_duration = Some(match self.min_duration {
            Some(min) => min.min(result.duration),
            None => result.duration,
        });
        self.max_duration = self.max_duration.max(result.duration);
    }

    pub fn total(&self) -> u64 {
        self.count_success + self.count_failed + self.count_http_error
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn merge(&mut self, other: &CategoryStats) {
        self.count_success += other.count_success;
        self.count_failed += other.count_failed;
        self.count_http_error += other.count_http_error;
        self.total_bytes += other.total_bytes;
        self.total_duration += other.total_duration;
        self.min_duration = match (self.min_duration, other.min_duration) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_duration = self.max_duration.max(other.max_duration);
    }
}

/// Final per-category statistics of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    stats: [CategoryStats; 3],
}

impl Breakdown {
    pub fn get(&self, category: Category) -> &CategoryStats {
        &self.stats[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryStats)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Merges every category into one; only called once, at report time.
    pub fn total(&self) -> CategoryStats {
        self.stats.iter().fold(CategoryStats::default(), |mut total, stats| {
            total.merge(stats);
            total
        })
    }
}

/// Last pipeline stage: folds results into per-category statistics.
pub struct Aggregator {
    breakdown: Breakdown,
    writer: Option<Box<dyn ResultWriter>>,
}

impl Aggregator {
    pub fn new(writer: Option<Box<dyn ResultWriter>>) -> Self {
        Self {
            breakdown: Breakdown::default(),
            writer,
        }
    }

    pub fn record(&mut self, result: &RequestResult) {
        self.breakdown.stats[result.category.index()].record(result);
    }

    pub fn into_breakdown(self) -> Breakdown {
        self.breakdown
    }

    /// Consumes results until every sender is gone.
    pub async fn run(mut self, mut results: mpsc::UnboundedReceiver<RequestResult>) -> Breakdown {
        while let Some(result) = results.recv().await {
            self.record(&result);
            self.forward(&result).await;
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.close().await {
                log::error!("Failed to close result output: {}", e);
            }
        }

        log::debug!("Aggregator finished with {} results", self.breakdown.total().total());
        self.breakdown
    }

    async fn forward(&mut self, result: &RequestResult) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write(result).await {
            log::error!("Result output failed, disabling it: {}", e);
            // Close it so what was already written stays well-formed.
            if let Some(mut writer) = self.writer.take() {
                if let Err(e) = writer.close().await {
                    log::error!("Failed to close result output: {}", e);
                }
            }
        }
    }
}
