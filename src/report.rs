use crate::aggregator::{Breakdown, CategoryStats};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

const RULE: &str = "===================================================================";

pub fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

fn serialize_opt_millis<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match duration {
        Some(d) => serialize_millis(d, serializer),
        None => serializer.serialize_none(),
    }
}

/// Figures reported for one category or for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub transactions: u64,
    /// Percentage of transactions that were neither failed nor HTTP errors.
    pub availability: f64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub bytes_transferred: u64,
    #[serde(rename = "response_time_ms", serialize_with = "serialize_millis")]
    pub response_time: Duration,
    /// Transactions per second of summed request time.
    pub transaction_rate: Option<f64>,
    pub successful: u64,
    pub failed: u64,
    pub http_errors: u64,
    #[serde(rename = "longest_ms", serialize_with = "serialize_opt_millis")]
    pub longest: Option<Duration>,
    #[serde(rename = "shortest_ms", serialize_with = "serialize_opt_millis")]
    pub shortest: Option<Duration>,
}

impl Section {
    /// `None` for a category without transactions.
    pub fn from_stats(title: &str, stats: &CategoryStats) -> Option<Self> {
        let total = stats.total();
        if total == 0 {
            return None;
        }

        let bad = (stats.count_failed + stats.count_http_error) as f64;
        let availability = 100.0 - bad / total as f64 * 100.0;

        let response_time =
            Duration::from_nanos((stats.total_duration.as_nanos() / u128::from(total)) as u64);

        let elapsed_secs = stats.total_duration.as_secs_f64();
        let transaction_rate = (elapsed_secs > 0.0).then(|| total as f64 / elapsed_secs);

        Some(Self {
            title: title.to_string(),
            transactions: total,
            availability,
            elapsed: stats.total_duration,
            bytes_transferred: stats.total_bytes,
            response_time,
            transaction_rate,
            successful: stats.count_success,
            failed: stats.count_failed,
            http_errors: stats.count_http_error,
            longest: stats.min_duration.map(|_| stats.max_duration),
            shortest: stats.min_duration,
        })
    }
}

fn fmt_opt_duration(duration: Option<Duration>) -> String {
    duration.map_or_else(|| "n/a".to_string(), |d| format!("{:?}", d))
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "|| {}", self.title)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Transactions: {} hits", self.transactions)?;
        writeln!(f, "Availability: {:.2} %", self.availability)?;
        writeln!(f, "Elapsed time: {:?}", self.elapsed)?;
        writeln!(f, "Data transferred: {} bytes", self.bytes_transferred)?;
        writeln!(f, "Response time: {:?}", self.response_time)?;
        match self.transaction_rate {
            Some(rate) => writeln!(f, "Transaction rate: {:.2}", rate)?,
            None => writeln!(f, "Transaction rate: n/a")?,
        }
        writeln!(f, "Successful transactions: {}", self.successful)?;
        writeln!(f, "Failed transactions: {}", self.failed)?;
        writeln!(f, "HTTP error transactions: {}", self.http_errors)?;
        writeln!(f, "Longest transaction: {}", fmt_opt_duration(self.longest))?;
        writeln!(f, "Shortest transaction: {}", fmt_opt_duration(self.shortest))
    }
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub categories: Vec<Section>,
    /// `None` when no request was performed.
    pub total: Option<Section>,
}

impl Report {
    pub fn new(
        breakdown: &Breakdown,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        cancelled: bool,
    ) -> Self {
        let categories = breakdown
            .iter()
            .filter_map(|(category, stats)| Section::from_stats(category.title(), stats))
            .collect();

        Self {
            started_at,
            finished_at,
            cancelled,
            categories,
            total: Section::from_stats("Total stats", &breakdown.total()),
        }
    }

    pub fn transactions(&self) -> u64 {
        self.total.as_ref().map_or(0, |total| total.transactions)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            writeln!(f, "Run was interrupted, statistics cover completed requests only")?;
        }
        for section in &self.categories {
            write!(f, "{}", section)?;
        }
        match &self.total {
            Some(total) => write!(f, "{}", total),
            None => writeln!(f, "No requests performed (0 transactions)"),
        }
    }
}
