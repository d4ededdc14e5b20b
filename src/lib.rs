pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod output;
pub mod report;
pub mod source;
pub mod task;

pub use aggregator::{Aggregator, Breakdown, CategoryStats};
pub use catalog::{CatalogSource, MySqlCatalog, StaticCatalog};
pub use dispatcher::Dispatcher;
pub use engine::{LoadEngine, RunState, RunSummary, StopHandle};
pub use error::{Error, Result};
pub use executor::{HttpExecutor, RequestExecutor};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use report::Report;
pub use source::TaskSource;
pub use task::{CatalogRecord, Category, Exchange, RequestResult, Task};
