use crate::aggregator::Aggregator;
use crate::catalog::CatalogSource;
use crate::config::CheckerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::metrics::collector::MetricsCollector;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::output::ResultWriter;
use crate::report::Report;
use crate::source::TaskSource;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// No new tasks are produced; in-flight requests are finishing.
    Stopping,
    Stopped,
}

impl RunState {
    pub fn is_stopping(self) -> bool {
        matches!(self, RunState::Stopping | RunState::Stopped)
    }
}

/// Requests a graceful stop of a running engine.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<watch::Sender<RunState>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.state.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Stopping;
                true
            } else {
                false
            }
        });
    }
}

pub struct RunSummary {
    pub report: Report,
    pub tasks_dispatched: usize,
    /// Set when the catalog could not be opened or read to the end.
    pub source_error: Option<Error>,
}

pub struct LoadEngine {
    base_url: String,
    concurrency: usize,
    metrics: Arc<MetricsCollector>,
    state: Arc<watch::Sender<RunState>>,
}

impl LoadEngine {
    pub fn new(base_url: impl Into<String>, concurrency: usize, metrics: Option<Arc<MetricsCollector>>) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);

        Self {
            base_url: base_url.into(),
            concurrency,
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
            state: Arc::new(state_tx),
        }
    }

    pub fn from_config(config: &CheckerConfig) -> Self {
        Self::new(config.base_url.clone(), config.concurrency, None)
    }

    /// Runs the pipeline; Ctrl-C stops task production and lets in-flight
    /// requests finish. A second Ctrl-C exits the process.
    pub async fn run(
        &self,
        catalog: Arc<dyn CatalogSource>,
        executor: Arc<dyn RequestExecutor>,
        writer: Option<Box<dyn ResultWriter>>,
    ) -> Result<RunSummary> {
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Can not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            tokio::spawn(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted again, aborting without a report");
                    std::process::exit(130);
                }
            });
        };
        self.run_until(catalog, executor, writer, interrupted).await
    }

    pub async fn run_until<F>(
        &self,
        catalog: Arc<dyn CatalogSource>,
        executor: Arc<dyn RequestExecutor>,
        writer: Option<Box<dyn ResultWriter>>,
        shutdown: F,
    ) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = Dispatcher::new(executor, self.concurrency, self.metrics.clone())?;
        let source = TaskSource::new(self.base_url.clone(), self.metrics.clone());

        self.set_state(RunState::Running);
        let started_at = Utc::now();

        // Bounded so that a stop leaves at most one queue's worth of work behind.
        let (tasks_tx, tasks_rx) = mpsc::channel(self.concurrency);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        // 1. Task source
        let state_rx = self.state.subscribe();
        let source_task = tokio::spawn(async move {
            source.run(catalog.as_ref(), tasks_tx, state_rx).await
        });

        // 2. Dispatcher
        let dispatch_task = tokio::spawn(async move {
            dispatcher.run(tasks_rx, results_tx).await
        });

        // 3. Aggregator
        let mut aggregate_task = tokio::spawn(Aggregator::new(writer).run(results_rx));

        tokio::pin!(shutdown);
        let breakdown = tokio::select! {
            breakdown = &mut aggregate_task => breakdown,
            _ = &mut shutdown => {
                log::info!("Shutting down, waiting for in-flight requests...");
                self.set_state(RunState::Stopping);
                aggregate_task.await
            }
        }
        .map_err(|e| Error::Internal(format!("aggregator task failed: {}", e)))?;

        let source_error = source_task
            .await
            .map_err(|e| Error::Internal(format!("task source failed: {}", e)))?
            .err();
        let tasks_dispatched = dispatch_task
            .await
            .map_err(|e| Error::Internal(format!("dispatcher failed: {}", e)))??;

        let cancelled = self.state().is_stopping();
        self.set_state(RunState::Stopped);
        log::info!("Run finished, {} requests performed", tasks_dispatched);

        Ok(RunSummary {
            report: Report::new(&breakdown, started_at, Utc::now(), cancelled),
            tasks_dispatched,
            source_error,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        let (tx, rx) = watch::channel(self.metrics.snapshot());
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(metrics.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }

    fn set_state(&self, state: RunState) {
        self.state.send_replace(state);
    }
}
