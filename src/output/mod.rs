use crate::error::Result;
use crate::task::RequestResult;
use async_trait::async_trait;

pub mod console;
pub mod csv;
pub mod json;

/// Sink for individual request results, fed by the aggregator.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    async fn write(&mut self, result: &RequestResult) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
