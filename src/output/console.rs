use super::ResultWriter;
use crate::error::{Error, Result};
use crate::task::RequestResult;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }

    pub fn format_line(result: &RequestResult) -> String {
        match (&result.protocol, result.status_code) {
            (Some(protocol), Some(status)) if !result.failed => format!(
                "{} {} {:?} {} bytes ==> {}",
                protocol, status, result.duration, result.content_length, result.url
            ),
            _ => format!("Url request failed: {}", result.url),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ResultWriter for ConsoleOutput {
    async fn write(&mut self, result: &RequestResult) -> Result<()> {
        let line = Self::format_line(result);

        if let Some(multi) = &self.multi {
            multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}
