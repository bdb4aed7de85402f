//! Pipeline settings persisted as TOML.

use crate::error::ConfigError;
use crate::export::DEFAULT_EXPORT_NAME;
use crate::processor::ProcessorKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub processor: ProcessorKind,
    /// Artificial per-item delay of the mock strategy.
    pub mock_delay_ms: u64,
    /// 1 processes sequentially; more uses a bounded worker pool.
    pub workers: usize,
    pub default_export_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processor: ProcessorKind::Mock,
            mock_delay_ms: 500,
            workers: 1,
            default_export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut cfg: PipelineConfig = toml::from_str(raw)?;
        cfg.workers = cfg.workers.clamp(1, MAX_WORKERS);
        Ok(cfg)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(write_err)
    }

    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }
}
