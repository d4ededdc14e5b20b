use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CheckerConfig {
    /// Prefix prepended verbatim to every catalog request path
    #[validate(url)]
    pub base_url: String,

    /// Maximum number of requests in flight
    #[validate(range(min = 1, max = 100000))]
    pub concurrency: usize,

    /// Worker threads for the async runtime
    #[validate(range(min = 1, max = 1024))]
    pub num_cpu: usize,

    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    #[validate(length(min = 1))]
    pub user_agent: String,

    #[validate]
    pub database: DatabaseConfig,

    pub output: OutputConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            concurrency: default_concurrency(),
            num_cpu: default_num_cpu(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            database: DatabaseConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    pub login: String,

    pub password: String,

    #[validate(length(min = 1))]
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            login: "root".to_string(),
            password: "root".to_string(),
            database: "magento".to_string(),
        }
    }
}

/// Where per-request results go while the run is in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    #[default]
    Console,
    None,
    Json {
        path: String,
    },
    Csv {
        path: String,
    },
}

fn default_concurrency() -> usize {
    50
}

fn default_num_cpu() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("perf-checker/", env!("CARGO_PKG_VERSION")).to_string()
}
