use crate::config::CheckerConfig;
use crate::error::Result;
use crate::task::Exchange;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Performs a single GET and reads the whole body.
///
/// An `Err` means the transport or the body read failed. Any HTTP status,
/// including 4xx/5xx, is a successful exchange.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, url: &str) -> Result<Exchange>;
}

pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &CheckerConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, url: &str) -> Result<Exchange> {
        let res = self.client.get(url).send().await?;
        let status_code = res.status().as_u16();
        let protocol = format!("{:?}", res.version());

        let body = res.bytes().await?;

        Ok(Exchange {
            status_code,
            protocol,
            content_length: body.len() as u64,
        })
    }
}
