use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::task::CatalogRecord;
use futures::stream::{self, BoxStream, StreamExt};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

/// System-generated rewrites only; ids are cast so unsigned columns decode as `i64`.
const URL_REWRITE_QUERY: &str = "SELECT request_path, \
     CAST(category_id AS SIGNED) AS category_id, \
     CAST(product_id AS SIGNED) AS product_id \
     FROM core_url_rewrite WHERE is_system = 1";

/// An ordered, finite source of catalog records.
///
/// Opening or querying the store happens lazily: a failure shows up as the
/// first (and last) item of the stream.
pub trait CatalogSource: Send + Sync {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>>;
}

pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    /// Builds a lazily connected pool; nothing touches the network until
    /// [`CatalogSource::records`] is polled.
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.login)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);

        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl CatalogSource for MySqlCatalog {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>> {
        sqlx::query_as::<_, CatalogRecord>(URL_REWRITE_QUERY)
            .fetch(&self.pool)
            .map(|row| row.map_err(Error::Database))
            .boxed()
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<CatalogRecord>,
}

impl StaticCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }
}

impl CatalogSource for StaticCatalog {
    fn records(&self) -> BoxStream<'_, Result<CatalogRecord>> {
        stream::iter(self.records.iter().cloned().map(Ok)).boxed()
    }
}
