use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use perf_checker::{
    CatalogRecord, CatalogSource, Category, Error, Exchange, HttpExecutor, LoadEngine,
    RequestExecutor, Result, RunState, StaticCatalog, StopHandle,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sleeps a little per call and records the highest number of concurrent calls.
struct Instrumented {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Instrumented {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Default for Instrumented {
    fn default() -> Self {
        Self::with_delay(Duration::from_millis(5))
    }
}

#[async_trait]
impl RequestExecutor for Instrumented {
    async fn execute(&self, url: &str) -> Result<Exchange> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Exchange {
            status_code: 200,
            protocol: "HTTP/1.1".into(),
            content_length: url.len() as u64,
        })
    }
}

struct AlwaysFails;

#[async_trait]
impl RequestExecutor for AlwaysFails {
    async fn execute(&self, _url: &str) -> Result<Exchange> {
        Err(Error::Internal("connection refused".into()))
    }
}

struct UnreachableCatalog;

impl CatalogSource for UnreachableCatalog {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>> {
        stream::once(async { Err(Error::Internal("Can not connect to catalog DB".into())) }).boxed()
    }
}

/// Hands out one record, then never yields again.
struct StallingCatalog;

impl CatalogSource for StallingCatalog {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>> {
        stream::iter(vec![Ok(CatalogRecord::new("first.html", None, Some(1)))])
            .chain(stream::pending())
            .boxed()
    }
}

/// Requests a stop right after `stop_after` records have been handed out.
struct StoppingCatalog {
    records: Vec<CatalogRecord>,
    stop_after: usize,
    handle: StopHandle,
}

impl CatalogSource for StoppingCatalog {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>> {
        stream::iter(self.records.iter().cloned().enumerate())
            .map(move |(i, record)| {
                if i == self.stop_after {
                    self.handle.stop();
                }
                Ok(record)
            })
            .boxed()
    }
}

fn records(n: usize) -> Vec<CatalogRecord> {
    (0..n)
        .map(|i| match i % 3 {
            0 => CatalogRecord::new(format!("product-{}.html", i), Some(2), Some(i as i64 + 1)),
            1 => CatalogRecord::new(format!("category-{}.html", i), Some(i as i64), None),
            _ => CatalogRecord::new(format!("page-{}.html", i), None, Some(0)),
        })
        .collect()
}

#[tokio::test]
async fn every_task_yields_one_result() {
    for limit in [1, 2, 7, 64] {
        let engine = LoadEngine::new("http://shop.test/", limit, None);
        let catalog = Arc::new(StaticCatalog::new(records(40)));

        let summary = engine
            .run_until(catalog, Arc::new(Instrumented::default()), None, std::future::pending())
            .await
            .unwrap();

        assert_eq!(summary.tasks_dispatched, 40, "limit {}", limit);
        assert_eq!(summary.report.transactions(), 40, "limit {}", limit);
        assert_eq!(engine.get_metrics().tasks_queued, 40);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_than_limit_in_flight() {
    let executor = Arc::new(Instrumented::default());
    let engine = LoadEngine::new("http://shop.test/", 3, None);

    let summary = engine
        .run_until(
            Arc::new(StaticCatalog::new(records(30))),
            executor.clone(),
            None,
            std::future::pending(),
        )
        .await
        .unwrap();

    assert_eq!(executor.calls.load(Ordering::SeqCst), 30);
    assert_eq!(summary.report.transactions(), 30);
    let peak = executor.peak.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak was {}", peak);
    assert!(engine.get_metrics().peak_in_flight <= 3);
    assert_eq!(engine.get_metrics().in_flight, 0);
}

#[tokio::test]
async fn empty_catalog_reports_zero_transactions() {
    let engine = LoadEngine::new("http://shop.test/", 50, None);

    let summary = engine
        .run_until(
            Arc::new(StaticCatalog::default()),
            Arc::new(Instrumented::default()),
            None,
            std::future::pending(),
        )
        .await
        .unwrap();

    assert_eq!(summary.tasks_dispatched, 0);
    assert_eq!(summary.report.transactions(), 0);
    assert!(summary.report.to_string().contains("No requests performed"));
}

#[tokio::test]
async fn unreachable_catalog_is_surfaced_with_an_empty_report() {
    let engine = LoadEngine::new("http://shop.test/", 5, None);

    let summary = engine
        .run_until(
            Arc::new(UnreachableCatalog),
            Arc::new(Instrumented::default()),
            None,
            std::future::pending(),
        )
        .await
        .unwrap();

    assert!(matches!(summary.source_error, Some(Error::Internal(_))));
    assert_eq!(summary.report.transactions(), 0);
    assert_eq!(engine.state(), RunState::Stopped);
}

#[tokio::test]
async fn stop_mid_run_reports_on_emitted_tasks_only() {
    let engine = LoadEngine::new("http://shop.test/", 4, None);
    let catalog = Arc::new(StoppingCatalog {
        records: records(50),
        stop_after: 12,
        handle: engine.stop_handle(),
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        engine.run_until(catalog, Arc::new(Instrumented::default()), None, std::future::pending()),
    )
    .await
    .expect("pipeline deadlocked")
    .unwrap();

    assert!(summary.report.cancelled);
    assert!(summary.report.transactions() <= 12);
    assert_eq!(summary.report.transactions(), summary.tasks_dispatched as u64);
    assert_eq!(engine.state(), RunState::Stopped);
}

#[tokio::test]
async fn shutdown_signal_drains_without_deadlock() {
    let executor = Arc::new(Instrumented::with_delay(Duration::from_millis(50)));
    let engine = LoadEngine::new("http://shop.test/", 2, None);

    // The signal fires while the first two requests are still running.
    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        engine.run_until(
            Arc::new(StaticCatalog::new(records(20))),
            executor.clone(),
            None,
            tokio::time::sleep(Duration::from_millis(30)),
        ),
    )
    .await
    .expect("pipeline deadlocked")
    .unwrap();

    assert!(summary.report.cancelled);
    // Two in flight, one held by the dispatcher, two queued.
    let transactions = summary.report.transactions();
    assert!(transactions >= 2, "in-flight requests were dropped: {}", transactions);
    assert!(transactions <= 5, "backlog kept running after the stop: {}", transactions);
    assert_eq!(transactions, summary.tasks_dispatched as u64);
    assert_eq!(executor.calls.load(Ordering::SeqCst), summary.tasks_dispatched);
    assert_eq!(engine.state(), RunState::Stopped);
}

#[tokio::test]
async fn shutdown_while_catalog_stalls_still_finishes() {
    let engine = LoadEngine::new("http://shop.test/", 4, None);

    let summary = tokio::time::timeout(
        Duration::from_secs(3),
        engine.run_until(
            Arc::new(StallingCatalog),
            Arc::new(Instrumented::default()),
            None,
            tokio::time::sleep(Duration::from_millis(100)),
        ),
    )
    .await
    .expect("stalled catalog kept the run alive")
    .unwrap();

    assert!(summary.report.cancelled);
    assert_eq!(summary.tasks_dispatched, 1);
    assert_eq!(summary.report.transactions(), 1);
    assert!(summary.source_error.is_none());
    assert_eq!(engine.state(), RunState::Stopped);
}

#[tokio::test]
async fn transport_failures_only_count_as_failed() {
    let engine = LoadEngine::new("http://shop.test/", 3, None);

    let summary = engine
        .run_until(
            Arc::new(StaticCatalog::new(vec![CatalogRecord::new("x.html", None, Some(9))])),
            Arc::new(AlwaysFails),
            None,
            std::future::pending(),
        )
        .await
        .unwrap();

    let total = summary.report.total.as_ref().unwrap();
    assert_eq!(total.failed, 1);
    assert_eq!(total.successful, 0);
    assert_eq!(total.http_errors, 0);
    assert_eq!(total.availability, 0.0);
    assert_eq!(engine.get_metrics().requests_failed, 1);
}

#[tokio::test]
async fn live_server_run_splits_statistics_by_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string("product page"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/c/.*"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/o/.*"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = Arc::new(StaticCatalog::new(vec![
        CatalogRecord::new("p/shirt.html", Some(4), Some(10)),
        CatalogRecord::new("p/jeans.html", None, Some(11)),
        CatalogRecord::new("p/socks.html", Some(4), Some(12)),
        CatalogRecord::new("c/men.html", Some(4), None),
        CatalogRecord::new("c/women.html", Some(5), Some(0)),
        CatalogRecord::new("o/about.html", None, None),
    ]));
    let executor = Arc::new(HttpExecutor::new(Duration::from_secs(5), "perf-checker-test").unwrap());
    let engine = LoadEngine::new(format!("{}/", server.uri()), 2, None);

    let summary = engine
        .run_until(catalog, executor, None, std::future::pending())
        .await
        .unwrap();
    let report = &summary.report;

    let titles: Vec<_> = report.categories.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![Category::Product.title(), Category::Category.title(), Category::Other.title()]
    );

    let product = &report.categories[0];
    assert_eq!(product.successful, 3);
    assert_eq!(product.bytes_transferred, 36);

    let category = &report.categories[1];
    assert_eq!(category.http_errors, 2);
    assert_eq!(category.availability, 0.0);

    let other = &report.categories[2];
    assert_eq!(other.http_errors, 1);

    let total = report.total.as_ref().unwrap();
    let sum = |f: fn(&perf_checker::report::Section) -> u64| report.categories.iter().map(f).sum::<u64>();
    assert_eq!(total.transactions, 6);
    assert_eq!(total.successful, sum(|s| s.successful));
    assert_eq!(total.http_errors, sum(|s| s.http_errors));
    assert_eq!(total.failed, sum(|s| s.failed));
    assert_eq!(total.bytes_transferred, sum(|s| s.bytes_transferred));
    assert_eq!(
        total.elapsed,
        report.categories.iter().map(|s| s.elapsed).sum::<Duration>()
    );
    assert!((total.availability - 50.0).abs() < 1e-9);
}
