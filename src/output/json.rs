use super::ResultWriter;
use crate::error::Result;
use crate::task::RequestResult;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes results as one JSON array.
pub struct JsonOutput {
    file: BufWriter<File>,
    first: bool,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut file = BufWriter::new(file);

        write!(file, "[")?;

        Ok(Self { file, first: true })
    }
}

#[async_trait]
impl ResultWriter for JsonOutput {
    async fn write(&mut self, result: &RequestResult) -> Result<()> {
        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, result)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        write!(self.file, "]")?;
        self.file.flush()?;
        Ok(())
    }
}
