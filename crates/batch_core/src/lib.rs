//! Batch image pipeline: validate a selection, run a pluggable processor over
//! it, and export the uniform records as CSV.

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod processor;
pub mod record;
pub mod runner;
pub mod validate;

pub use config::PipelineConfig;
pub use controller::{Controller, ControllerState, ExportOutcome, Notification, Notifier};
pub use error::{ConfigError, ExportError, ProcessingError, ValidationError};
pub use export::{DEFAULT_EXPORT_NAME, export_csv, validate, validate_values};
pub use processor::{DimensionsProcessor, ItemProcessor, MockProcessor, ProcessorKind};
pub use record::{FieldValue, Record};
pub use runner::{BatchOutcome, CancelFlag, ItemFailure, RunEvent, run, run_parallel};
pub use validate::{ACCEPTED_EXTENSIONS, ScanOptions, Selection, is_valid_image, scan_folder};
