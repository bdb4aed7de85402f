//! CSV export of a processed batch.

use crate::error::{ExportError, ValidationError};
use crate::record::Record;
use std::collections::BTreeSet;
use std::path::Path;

/// File name suggested by the save dialog.
pub const DEFAULT_EXPORT_NAME: &str = "processed_images.csv";

/// Header (first record's key order) when every record shares one key set.
pub fn check_schema(records: &[Record]) -> Result<Vec<String>, ValidationError> {
    let first = records.first().ok_or(ValidationError::EmptyInput)?;
    let expected = first.key_set();
    for (index, record) in records.iter().enumerate().skip(1) {
        let found = record.key_set();
        if found != expected {
            return Err(ValidationError::SchemaMismatch {
                index,
                expected: expected.iter().map(|k| k.to_string()).collect(),
                found: found.iter().map(|k| k.to_string()).collect(),
            });
        }
    }
    Ok(first.keys().map(str::to_string).collect())
}

/// True iff `records` is non-empty and uniform.
pub fn validate(records: &[Record]) -> bool {
    check_schema(records).is_ok()
}

/// Untyped gate for data that did not come from an `ItemProcessor`:
/// every element must be a JSON object of scalars with the same keys.
pub fn validate_values(values: &[serde_json::Value]) -> bool {
    if values.is_empty() {
        return false;
    }
    let mut expected: Option<BTreeSet<&str>> = None;
    for value in values {
        let Some(obj) = value.as_object() else {
            return false;
        };
        if Record::from_json(value).is_none() {
            return false;
        }
        let keys: BTreeSet<&str> = obj.keys().map(String::as_str).collect();
        let first = expected.get_or_insert_with(|| keys.clone());
        if *first != keys {
            return false;
        }
    }
    true
}

/// Writes `records` to `path` as UTF-8 CSV with a header row.
///
/// Input is checked before the destination is opened, so an empty or mixed
/// batch never creates a file.
pub fn export_csv(records: &[Record], path: impl AsRef<Path>) -> Result<(), ExportError> {
    let header = check_schema(records)?;
    let path = path.as_ref();

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&header)?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| record.get(key).map(ToString::to_string).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    tracing::info!("exported {} row(s) to {}", records.len(), path.display());
    Ok(())
}
