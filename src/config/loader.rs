use crate::config::schema::{CheckerConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::output::{ResultWriter, console::ConsoleOutput, csv::CsvOutput, json::JsonOutput};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CheckerConfig> {
        let config = Self::load_file(path.as_ref())?;
        Self::validate(config)
    }

    /// Reads a configuration file without validating it, so that command
    /// line overrides can still fill in missing fields.
    pub fn load_file(path: &Path) -> Result<CheckerConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    pub fn validate(config: CheckerConfig) -> Result<CheckerConfig> {
        config.validate()?;
        Ok(config)
    }

    pub fn create_writer(
        config: &CheckerConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Option<Box<dyn ResultWriter>>> {
        let writer: Box<dyn ResultWriter> = match &config.output {
            OutputConfig::None => return Ok(None),
            OutputConfig::Console => Box::new(ConsoleOutput::new(multi)),
            OutputConfig::Json { path } => Box::new(JsonOutput::new(PathBuf::from(path))?),
            OutputConfig::Csv { path } => Box::new(CsvOutput::new(PathBuf::from(path))?),
        };
        Ok(Some(writer))
    }
}
