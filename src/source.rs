use crate::catalog::CatalogSource;
use crate::engine::RunState;
use crate::error::Result;
use crate::metrics::collector::MetricsCollector;
use crate::task::{CatalogRecord, Category, Task};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// First pipeline stage: turns catalog records into tasks.
pub struct TaskSource {
    base_url: String,
    metrics: Arc<MetricsCollector>,
}

impl TaskSource {
    pub fn new(base_url: impl Into<String>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            base_url: base_url.into(),
            metrics,
        }
    }

    pub fn task_for(&self, record: &CatalogRecord) -> Task {
        Task {
            url: format!("{}{}", self.base_url, record.request_path),
            category: Category::classify(record),
        }
    }

    /// Emits one task per record, in catalog order, and returns how many were
    /// sent. The task queue is closed when this returns, whether the catalog
    /// was exhausted, a stop was requested, or the catalog failed. A stop is
    /// honored while waiting on the catalog or on a full queue.
    pub async fn run(
        &self,
        catalog: &dyn CatalogSource,
        tasks: mpsc::Sender<Task>,
        mut state: watch::Receiver<RunState>,
    ) -> Result<usize> {
        let mut records = catalog.records();
        let mut emitted = 0;

        loop {
            let record = tokio::select! {
                biased;
                _ = stop_requested(&mut state) => break,
                record = records.next() => record,
            };

            let record = match record {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    log::error!("Can not read urls from catalog: {}", e);
                    return Err(e);
                }
                None => break,
            };

            let task = self.task_for(&record);
            tokio::select! {
                biased;
                _ = stop_requested(&mut state) => break,
                sent = tasks.send(task) => {
                    if sent.is_err() {
                        log::warn!("Task queue closed, stopping task production");
                        break;
                    }
                }
            }
            self.metrics.increment_tasks_queued();
            emitted += 1;
        }

        if state.borrow().is_stopping() {
            log::info!("Stop requested, no more tasks after {} emitted", emitted);
        }
        log::debug!("Task source finished with {} tasks", emitted);
        Ok(emitted)
    }
}

/// Resolves once the engine leaves `Running`; never resolves if the engine is gone.
async fn stop_requested(state: &mut watch::Receiver<RunState>) {
    let stopping = state.wait_for(|s| s.is_stopping()).await.is_ok();
    if !stopping {
        std::future::pending::<()>().await;
    }
}
