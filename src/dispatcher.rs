use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::metrics::collector::MetricsCollector;
use crate::task::{RequestResult, Task};
use futures::FutureExt;
use futures::stream::StreamExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;

/// Second pipeline stage: runs each task as its own tokio task, with at most
/// `concurrency` of them in flight.
pub struct Dispatcher {
    executor: Arc<dyn RequestExecutor>,
    gate: Arc<Semaphore>,
    limit: u32,
    metrics: Arc<MetricsCollector>,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        concurrency: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let limit = u32::try_from(concurrency)
            .ok()
            .filter(|&n| n >= 1 && n as usize <= Semaphore::MAX_PERMITS)
            .ok_or_else(|| Error::Config(format!("Invalid concurrency limit: {}", concurrency)))?;

        Ok(Self {
            executor,
            gate: Arc::new(Semaphore::new(limit as usize)),
            limit,
            metrics,
        })
    }

    /// Consumes the task queue and emits exactly one result per task, in
    /// completion order. Returns once every admitted request has emitted its
    /// result; the result queue is closed at that point.
    pub async fn run(
        &self,
        tasks: mpsc::Receiver<Task>,
        results: mpsc::UnboundedSender<RequestResult>,
    ) -> Result<usize> {
        let mut tasks = ReceiverStream::new(tasks);
        let mut dispatched = 0;

        while let Some(task) = tasks.next().await {
            let permit = self
                .gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Internal("admission gate closed".to_string()))?;

            self.metrics.request_started();
            let executor = self.executor.clone();
            let results = results.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                let result = execute(executor.as_ref(), task).await;
                metrics.request_finished(&result);
                if results.send(result).is_err() {
                    log::error!("Result queue closed, result dropped");
                }
                // The slot stays taken until the result is handed off.
                drop(permit);
            });
            dispatched += 1;
        }

        log::debug!("Task queue exhausted, waiting for in-flight requests");
        let _drained = self
            .gate
            .acquire_many(self.limit)
            .await
            .map_err(|_| Error::Internal("admission gate closed".to_string()))?;

        log::debug!("Dispatcher finished with {} requests", dispatched);
        Ok(dispatched)
    }
}

async fn execute(executor: &dyn RequestExecutor, task: Task) -> RequestResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(executor.execute(&task.url))
        .catch_unwind()
        .await;
    let duration = start.elapsed();

    match outcome {
        Ok(Ok(exchange)) => {
            log::debug!(
                "{} {} {:?} {} bytes ==> {}",
                exchange.protocol, exchange.status_code, duration, exchange.content_length, task.url
            );
            RequestResult::completed(task, duration, exchange)
        }
        Ok(Err(e)) => {
            log::warn!("Url request failed: {}: {}", task.url, e);
            RequestResult::failed(task, duration)
        }
        Err(_) => {
            log::error!("Request executor panicked on {}", task.url);
            RequestResult::failed(task, duration)
        }
    }
}
