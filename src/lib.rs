//! Amazon Bedrock Fine-Tuning
//!
//! Validate a conversational training dataset, upload it to S3, launch a
//! Bedrock model customization job, watch its status and invoke the result.
//!
//! # Features
//!
//! - **Dataset contract**: every JSONL line is checked before anything leaves the machine
//! - **Customization jobs**: submit, describe, list, stop
//! - **Provisioned throughput**: make a custom model invocable
//! - **Invocation**: Anthropic messages payloads on Bedrock Runtime
//! - **AWS Signature V4**: signing for `bedrock`, `bedrock-runtime` and `s3`
//! - **Pass-through errors**: remote failures arrive exactly as the service sent them
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bedrock_finetune::{
//!     BedrockClientBuilder, CreateCustomizationJobRequest, Hyperparameters, JobPlan, S3Uri,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bedrock_finetune::BedrockError> {
//!     let client = BedrockClientBuilder::new().from_env().build()?;
//!
//!     let request = CreateCustomizationJobRequest::new(
//!         "support-ft-1",
//!         "support-model-1",
//!         "arn:aws:iam::123456789012:role/BedrockFineTune",
//!         "anthropic.claude-3-haiku-20240307-v1:0:200k",
//!         S3Uri::new("my-datasets", "support/train.jsonl"),
//!         S3Uri::new("my-datasets", "support/output/"),
//!     )
//!     .with_hyperparameters(
//!         Hyperparameters::new()
//!             .epoch_count(5)
//!             .batch_size(4)
//!             .learning_rate_multiplier("1.0"),
//!     );
//!
//!     let outcome = client.workflow().run(JobPlan::new("train.jsonl", request)).await?;
//!     println!("Submitted {}", outcome.job);
//!     Ok(())
//! }
//! ```
//!
//! # Polling and Invocation
//!
//! The crate never loops on its own; callers decide how often to ask.
//!
//! ```rust,no_run
//! use bedrock_finetune::{BedrockClient, BedrockClientBuilder, MessagesRequest};
//! use std::time::Duration;
//!
//! # async fn example(job_arn: &str, provisioned_arn: &str) -> Result<(), bedrock_finetune::BedrockError> {
//! let client = BedrockClientBuilder::new().from_env().build()?;
//!
//! loop {
//!     let status = client.customization().poll_status(job_arn).await?;
//!     if status.is_terminal() {
//!         break;
//!     }
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//! }
//!
//! let text = client
//!     .runtime()
//!     .invoke_text(provisioned_arn, MessagesRequest::user(1000, "Summarize ticket #42"))
//!     .await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod dataset;
pub mod error;
pub mod mocks;
pub mod services;
pub mod signing;
pub mod transport;
pub mod types;
pub mod workflow;

// Client
pub use client::{BedrockClient, BedrockClientBuilder, BedrockClientImpl};

// Configuration
pub use config::{BedrockConfig, BedrockConfigBuilder};

// Credentials
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    ProfileCredentialsProvider, StaticCredentialsProvider,
};

// Dataset
pub use dataset::{
    parse_records, read_records, DatasetPreparer, DatasetSummary, PreparedDataset, UploadOutput,
};

// Errors
pub use error::{
    BedrockError, ConfigurationError, CredentialsError, DatasetError, NetworkError,
    ResponseError, ServiceError,
};

// Services
pub use services::{
    CustomizationService, PutObjectOutput, PutObjectRequest, ProvisioningService,
    RuntimeService, StorageService,
};

// Signing
pub use signing::{AwsSigner, SigV4Signer};

// Transport
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

// Types
pub use types::{
    validate_record, ContentBlock, CreateCustomizationJobRequest, CustomizationJob,
    CustomizationType, Hyperparameters, JobHandle, JobStatus, JobSummary, ListJobsRequest,
    ListJobsResponse, Message, MessagesRequest, MessagesResponse, ProvisionedStatus,
    ProvisionedThroughput, ProvisionedThroughputRequest, RecordError, Role, S3Uri,
    TrainingRecord, ANTHROPIC_VERSION,
};

// Workflow
pub use workflow::{FineTuneWorkflow, JobPlan, WorkflowOutcome};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BedrockError>;

/// Create a client from environment variables.
///
/// Reads `AWS_REGION` / `AWS_DEFAULT_REGION`, the `AWS_ENDPOINT_URL*`
/// overrides and resolves credentials from the environment, then the shared
/// credentials file.
///
/// # Example
///
/// ```rust,no_run
/// let client = bedrock_finetune::create_client_from_env()?;
/// # Ok::<(), bedrock_finetune::BedrockError>(())
/// ```
pub fn create_client_from_env() -> Result<BedrockClientImpl> {
    BedrockClientBuilder::new().from_env().build()
}
