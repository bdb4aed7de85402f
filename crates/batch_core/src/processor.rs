//! Per-item processing strategies.

use crate::config::PipelineConfig;
use crate::error::ProcessingError;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Format of the `processed_timestamp` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns one validated image path into a [`Record`].
///
/// Every record a given processor returns must carry the same field names.
/// Implementations only read the input file.
pub trait ItemProcessor: Send + Sync {
    fn name(&self) -> &str;
    fn process(&self, path: &Path) -> Result<Record, ProcessingError>;
}

/// Which strategy to build from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// Fabricated analysis fields after an artificial delay.
    #[default]
    Mock,
    /// Real width, height and format read from the image header.
    Dimensions,
}

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 2] = [ProcessorKind::Mock, ProcessorKind::Dimensions];

    pub fn label(self) -> &'static str {
        match self {
            ProcessorKind::Mock => "Mock analysis",
            ProcessorKind::Dimensions => "Image dimensions",
        }
    }

    pub fn build(self, cfg: &PipelineConfig) -> Arc<dyn ItemProcessor> {
        match self {
            ProcessorKind::Mock => Arc::new(MockProcessor::new(cfg.mock_delay())),
            ProcessorKind::Dimensions => Arc::new(DimensionsProcessor),
        }
    }
}

/// Placeholder strategy: real file size and timestamp, fixed analysis values.
#[derive(Debug, Clone)]
pub struct MockProcessor {
    delay: Duration,
}

impl MockProcessor {
    pub const WIDTH: i64 = 1920;
    pub const HEIGHT: i64 = 1080;
    pub const DETECTED_OBJECTS: &'static str = "person, car, tree";
    pub const CONFIDENCE: f64 = 0.95;

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl ItemProcessor for MockProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    fn process(&self, path: &Path) -> Result<Record, ProcessingError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let record = base_record(path)?
            .with("mock_width", Self::WIDTH)
            .with("mock_height", Self::HEIGHT)
            .with("mock_detected_objects", Self::DETECTED_OBJECTS)
            .with("mock_confidence_score", Self::CONFIDENCE);
        Ok(record)
    }
}

/// Reads the image header only; no pixel decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionsProcessor;

impl ItemProcessor for DimensionsProcessor {
    fn name(&self) -> &str {
        "dimensions"
    }

    fn process(&self, path: &Path) -> Result<Record, ProcessingError> {
        let record = base_record(path)?;
        let decode = |source: image::ImageError| ProcessingError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let format = image::ImageFormat::from_path(path).map_err(decode)?;
        let (width, height) = image::image_dimensions(path).map_err(decode)?;
        Ok(record
            .with("format", format!("{format:?}").to_lowercase())
            .with("width", width)
            .with("height", height))
    }
}

/// Fields every strategy starts with: name, path, size and timestamp.
fn base_record(path: &Path) -> Result<Record, ProcessingError> {
    let meta = fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ProcessingError::Missing {
            path: path.to_path_buf(),
        },
        _ => ProcessingError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !meta.is_file() {
        return Err(ProcessingError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

    Ok(Record::new()
        .with("filename", filename)
        .with("file_path", path.to_string_lossy().into_owned())
        .with("file_size_kb", size_kb(meta.len()))
        .with("processed_timestamp", timestamp))
}

fn size_kb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}
