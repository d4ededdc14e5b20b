use super::ResultWriter;
use crate::error::Result;
use crate::task::RequestResult;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;
        Ok(Self { writer })
    }
}

#[async_trait]
impl ResultWriter for CsvOutput {
    async fn write(&mut self, result: &RequestResult) -> Result<()> {
        // Header row comes from the first serialized record.
        self.writer.serialize(result)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
