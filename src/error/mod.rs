//! Error types for the Bedrock fine-tuning integration.
//!
//! Remote failures are carried as [`ServiceError`] exactly as the service
//! reported them: status, error code, message and request id. Nothing here
//! decides whether an error is worth retrying.

mod mapping;

pub use mapping::{map_json_error, map_s3_error, parse_error_type};

use crate::types::RecordError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the integration.
#[derive(Debug, Error)]
pub enum BedrockError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Local dataset errors.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// An error returned by a remote AWS service.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Network errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// A successful response that could not be interpreted.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl BedrockError {
    /// Returns the HTTP status code if the error came from a service response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BedrockError::Service(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns the AWS error code if available.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            BedrockError::Service(e) => e.code.as_deref(),
            _ => None,
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            BedrockError::Service(e) => e.request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this is a local dataset validation failure.
    pub fn is_dataset_error(&self) -> bool {
        matches!(self, BedrockError::Dataset(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing required region configuration.
    #[error("Missing region: region must be specified via config or environment")]
    MissingRegion,

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Region string is not a recognizable AWS region.
    #[error("Invalid region '{region}'")]
    InvalidRegion {
        /// The rejected region.
        region: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },
}

/// Errors raised while reading or validating a local dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        /// Path of the dataset file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not valid UTF-8 JSON.
    #[error("Line {line}: malformed JSON: {message}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// Decoder message.
        message: String,
    },

    /// A line decoded but violates the training record contract.
    #[error("Line {line}: {source}")]
    InvalidRecord {
        /// 1-based line number.
        line: usize,
        /// The violated rule.
        #[source]
        source: RecordError,
    },

    /// The dataset holds no records.
    #[error("Dataset contains no records")]
    Empty,
}

impl DatasetError {
    /// Returns the 1-based line number of the offending record, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            DatasetError::MalformedLine { line, .. } | DatasetError::InvalidRecord { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

/// An error response from an AWS service, passed through unchanged.
#[derive(Debug, Clone, Error)]
pub struct ServiceError {
    /// Signing name of the service that answered (`bedrock`, `bedrock-runtime`, `s3`).
    pub service: String,
    /// HTTP status code.
    pub status: u16,
    /// AWS error code, e.g. `ValidationException` or `AccessDenied`.
    pub code: Option<String>,
    /// Service-provided message.
    pub message: Option<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} returned {}", self.service, self.status)?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        write!(f, ": {}", self.message.as_deref().unwrap_or("no message"))
    }
}

/// Network errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },
}

/// Errors interpreting a successful response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The body did not match the expected shape.
    #[error("Failed to parse {operation} response: {message}")]
    Parse {
        /// Operation whose response failed to parse.
        operation: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The model answered without any text content block.
    #[error("Response from '{model_id}' contains no text content")]
    NoTextContent {
        /// The model that was invoked.
        model_id: String,
    },
}
