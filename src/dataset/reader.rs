//! Line-delimited record reading.

use crate::error::DatasetError;
use crate::types::{RecordDecodeError, TrainingRecord};
use std::io::BufRead;
use std::path::Path;

const UTF8_BOM: char = '\u{FEFF}';

/// Parse every non-blank line of `reader` as a training record.
///
/// Stops at the first bad line; line numbers are 1-based. A UTF-8 byte-order
/// mark at the start of the input is ignored.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<TrainingRecord>, DatasetError> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| DatasetError::MalformedLine {
            line: line_number,
            message: e.to_string(),
        })?;

        let line = match index {
            0 => line.strip_prefix(UTF8_BOM).unwrap_or(&line),
            _ => &line,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record = TrainingRecord::from_json_line(trimmed).map_err(|e| match e {
            RecordDecodeError::Malformed(message) => DatasetError::MalformedLine {
                line: line_number,
                message,
            },
            RecordDecodeError::Invalid(source) => DatasetError::InvalidRecord {
                line: line_number,
                source,
            },
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(records)
}

/// Read and validate a dataset file.
pub async fn read_records(path: impl AsRef<Path>) -> Result<Vec<TrainingRecord>, DatasetError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(bytes.as_slice())
}
