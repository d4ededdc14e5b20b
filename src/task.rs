use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One row of the URL catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogRecord {
    pub request_path: String,
    pub category_id: Option<i64>,
    pub product_id: Option<i64>,
}

impl CatalogRecord {
    pub fn new(request_path: impl Into<String>, category_id: Option<i64>, product_id: Option<i64>) -> Self {
        Self {
            request_path: request_path.into(),
            category_id,
            product_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Product,
    Category,
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Product, Category::Category, Category::Other];

    /// A non-zero product id wins over a non-zero category id.
    pub fn classify(record: &CatalogRecord) -> Self {
        let is_set = |id: Option<i64>| id.is_some_and(|id| id != 0);

        if is_set(record.product_id) {
            Category::Product
        } else if is_set(record.category_id) {
            Category::Category
        } else {
            Category::Other
        }
    }

    pub fn index(self) -> usize {
        match self {
            Category::Product => 0,
            Category::Category => 1,
            Category::Other => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Product => "Product",
            Category::Category => "Category",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A URL to fetch, tagged with the category it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: String,
    pub category: Category,
}

/// What the transport hands back for a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub status_code: u16,
    pub protocol: String,
    pub content_length: u64,
}

/// Outcome of executing exactly one [`Task`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    pub url: String,
    pub category: Category,
    #[serde(rename = "duration_ms", serialize_with = "crate::report::serialize_millis")]
    pub duration: Duration,
    pub failed: bool,
    pub status_code: Option<u16>,
    pub protocol: Option<String>,
    pub content_length: u64,
}

impl RequestResult {
    pub fn completed(task: Task, duration: Duration, exchange: Exchange) -> Self {
        Self {
            url: task.url,
            category: task.category,
            duration,
            failed: false,
            status_code: Some(exchange.status_code),
            protocol: Some(exchange.protocol),
            content_length: exchange.content_length,
        }
    }

    pub fn failed(task: Task, duration: Duration) -> Self {
        Self {
            url: task.url,
            category: task.category,
            duration,
            failed: true,
            status_code: None,
            protocol: None,
            content_length: 0,
        }
    }
}
