use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use perf_checker::config::{CheckerConfig, ConfigLoader};
use perf_checker::engine::{LoadEngine, RunSummary};
use perf_checker::executor::HttpExecutor;
use perf_checker::metrics::snapshot::MetricsSnapshot;
use perf_checker::MySqlCatalog;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "perf-checker")]
#[command(version)]
#[command(about = "Replays a shop's URL catalog against a live server and reports response times per URL category", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every catalog URL and print the statistics
    Run {
        /// Path to a configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Show a progress bar (stderr)
        #[arg(short, long)]
        progress: bool,

        /// Also write the report as JSON to this path
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command line values win over the configuration file.
#[derive(Args)]
struct Overrides {
    /// Prefix prepended to every request path
    #[arg(long)]
    base_url: Option<String>,

    /// Number of parallel connections
    #[arg(short = 'n', long)]
    concurrency: Option<usize>,

    /// Number of runtime worker threads
    #[arg(long)]
    num_cpu: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    request_timeout: Option<u64>,

    #[arg(long)]
    mysql_host: Option<String>,

    #[arg(long)]
    mysql_port: Option<u16>,

    #[arg(long)]
    mysql_login: Option<String>,

    #[arg(long)]
    mysql_password: Option<String>,

    #[arg(long)]
    magento_database: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut CheckerConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(num_cpu) = self.num_cpu {
            config.num_cpu = num_cpu;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(host) = self.mysql_host {
            config.database.host = host;
        }
        if let Some(port) = self.mysql_port {
            config.database.port = port;
        }
        if let Some(login) = self.mysql_login {
            config.database.login = login;
        }
        if let Some(password) = self.mysql_password {
            config.database.password = password;
        }
        if let Some(database) = self.magento_database {
            config.database.database = database;
        }
    }
}

fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, overrides, progress, report_json } => {
            let logger = env_logger::Builder::from_default_env().build();
            let multi = Arc::new(MultiProgress::new());
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_max_level(logger.filter());
                log::set_boxed_logger(Box::new(logger))?;
            }

            let mut checker_config = match &config {
                Some(path) => {
                    log::info!("Loading config from {:?}", path);
                    ConfigLoader::load_file(path)?
                }
                None => CheckerConfig::default(),
            };
            overrides.apply(&mut checker_config);
            let checker_config = ConfigLoader::validate(checker_config)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(checker_config.num_cpu)
                .enable_all()
                .build()?;
            let summary = runtime.block_on(run(checker_config, progress.then_some(multi)))?;

            println!();
            print!("{}", summary.report);

            if let Some(path) = report_json {
                let file = File::create(&path)
                    .with_context(|| format!("Can not create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &summary.report)?;
                log::info!("Report written to {}", path.display());
            }

            if let Some(e) = summary.source_error {
                return Err(e).context("Can not read urls from the catalog database");
            }
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Base URL: {}", cfg.base_url);
                    println!("   Concurrency: {}", cfg.concurrency);
                    println!(
                        "   Catalog: {}@{}:{}/{}",
                        cfg.database.login, cfg.database.host, cfg.database.port, cfg.database.database
                    );
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn run(config: CheckerConfig, multi: Option<Arc<MultiProgress>>) -> anyhow::Result<RunSummary> {
    let catalog = Arc::new(MySqlCatalog::new(&config.database));
    let executor = Arc::new(HttpExecutor::from_config(&config)?);
    let writer = ConfigLoader::create_writer(&config, multi.clone())?;
    let engine = LoadEngine::from_config(&config);

    let mut progress_bar: Option<ProgressBar> = None;
    let mut progress_task = None;
    if let Some(multi) = &multi {
        let pb = multi.add(ProgressBar::new(0));
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"));

        let mut metrics_rx = engine.watch_metrics();
        let pb_clone = pb.clone();
        progress_bar = Some(pb);
        progress_task = Some(tokio::spawn(async move {
            while metrics_rx.changed().await.is_ok() {
                let snapshot: MetricsSnapshot = metrics_rx.borrow().clone();
                pb_clone.set_length(snapshot.tasks_queued);
                pb_clone.set_position(snapshot.requests_completed);
                pb_clone.set_message(format!(
                    "Failed: {} | In flight: {} | RPS: {:.2}",
                    snapshot.requests_failed, snapshot.in_flight, snapshot.requests_per_second
                ));
            }
        }));
    }

    log::info!(
        "Starting run against {} with {} connections",
        config.base_url, config.concurrency
    );
    let summary = engine.run(catalog.clone(), executor, writer).await;
    catalog.close().await;

    if let Some(task) = progress_task {
        task.abort();
    }
    if let Some(pb) = progress_bar {
        let final_metrics = engine.get_metrics();
        pb.finish_with_message(format!(
            "Failed: {} | Peak in flight: {} | RPS: {:.2} - Completed",
            final_metrics.requests_failed, final_metrics.peak_in_flight, final_metrics.requests_per_second
        ));
    }

    Ok(summary?)
}
