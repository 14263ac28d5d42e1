//! Dataset preparation: validate a local JSONL file, then upload it unmodified.

mod reader;

pub use reader::{parse_records, read_records};

use crate::error::{BedrockError, DatasetError};
use crate::services::{PutObjectRequest, StorageService};
use crate::signing::sha256_hex;
use crate::types::{S3Uri, TrainingRecord};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Content type used for dataset uploads.
pub const JSONL_CONTENT_TYPE: &str = "application/jsonl";

/// Statistics about a validated dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    /// Number of records.
    pub record_count: usize,
    /// Records carrying a system instruction.
    pub records_with_system: usize,
    /// Turns across all records.
    pub total_messages: usize,
    /// File size in bytes.
    pub size_bytes: u64,
    /// SHA-256 of the file contents, lowercase hex.
    pub sha256: String,
}

impl DatasetSummary {
    /// Summarize `records` parsed from `bytes`.
    pub fn from_records(records: &[TrainingRecord], bytes: &[u8]) -> Self {
        Self {
            record_count: records.len(),
            records_with_system: records.iter().filter(|r| r.system.is_some()).count(),
            total_messages: records.iter().map(|r| r.messages.len()).sum(),
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        }
    }
}

/// A dataset that passed validation, with the exact bytes that will be uploaded.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// Source path.
    pub path: PathBuf,
    /// Validated records.
    pub records: Vec<TrainingRecord>,
    /// Summary statistics.
    pub summary: DatasetSummary,
    contents: Bytes,
}

impl PreparedDataset {
    /// Raw file contents.
    pub fn contents(&self) -> &Bytes {
        &self.contents
    }
}

/// Where a dataset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutput {
    /// Destination.
    pub location: S3Uri,
    /// Entity tag reported by S3.
    pub e_tag: Option<String>,
    /// S3 request ID.
    pub request_id: Option<String>,
    /// Bytes written.
    pub size_bytes: u64,
}

/// Validates dataset files and transfers them to object storage.
pub struct DatasetPreparer {
    storage: Arc<dyn StorageService>,
}

impl DatasetPreparer {
    /// Create a preparer that uploads through `storage`.
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Read `path` once and validate every record.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn prepare(&self, path: impl AsRef<Path>) -> Result<PreparedDataset, BedrockError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records = parse_records(bytes.as_slice())?;
        let summary = DatasetSummary::from_records(&records, &bytes);
        info!(
            records = summary.record_count,
            with_system = summary.records_with_system,
            bytes = summary.size_bytes,
            "Dataset validated"
        );

        Ok(PreparedDataset {
            path: path.to_path_buf(),
            records,
            summary,
            contents: Bytes::from(bytes),
        })
    }

    /// Upload a prepared dataset unmodified.
    #[instrument(skip(self, dataset, destination), fields(destination = %destination))]
    pub async fn upload(
        &self,
        dataset: &PreparedDataset,
        destination: &S3Uri,
    ) -> Result<UploadOutput, BedrockError> {
        let output = self
            .storage
            .put_object(
                PutObjectRequest::new(destination, dataset.contents.clone())
                    .with_content_type(JSONL_CONTENT_TYPE),
            )
            .await?;

        info!(records = dataset.summary.record_count, "Dataset uploaded");
        Ok(UploadOutput {
            location: destination.clone(),
            e_tag: output.e_tag,
            request_id: output.request_id,
            size_bytes: dataset.summary.size_bytes,
        })
    }

    /// Validate then upload. Nothing is transferred if validation fails.
    pub async fn prepare_and_upload(
        &self,
        path: impl AsRef<Path>,
        destination: &S3Uri,
    ) -> Result<(PreparedDataset, UploadOutput), BedrockError> {
        let dataset = self.prepare(path).await?;
        let upload = self.upload(&dataset, destination).await?;
        Ok((dataset, upload))
    }
}
