//! Model customization job types.

use super::common::S3Uri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hyperparameters passed through to the service as string key/value pairs.
///
/// Nothing is validated locally; the service rejects values it does not accept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(BTreeMap<String, String>);

impl Hyperparameters {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary hyperparameter.
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Number of passes over the training data.
    pub fn epoch_count(self, epochs: u32) -> Self {
        self.set("epochCount", epochs)
    }

    /// Samples per training step.
    pub fn batch_size(self, batch_size: u32) -> Self {
        self.set("batchSize", batch_size)
    }

    /// Multiplier applied to the base model's learning rate.
    pub fn learning_rate_multiplier(self, multiplier: impl ToString) -> Self {
        self.set("learningRateMultiplier", multiplier)
    }

    /// Warmup steps before the learning rate reaches its target.
    pub fn learning_rate_warmup_steps(self, steps: u32) -> Self {
        self.set("learningRateWarmupSteps", steps)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no hyperparameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Hyperparameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Kind of customization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomizationType {
    /// Supervised fine-tuning on labeled conversations.
    #[default]
    FineTuning,
    /// Continued pre-training on unlabeled text.
    ContinuedPreTraining,
    /// Distillation from a teacher model.
    Distillation,
}

/// Parameters of a new customization job.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCustomizationJobRequest {
    /// Job name, unique within the account and region.
    pub job_name: String,
    /// Name of the resulting custom model, unique within the account and region.
    pub custom_model_name: String,
    /// IAM role the service assumes to read the dataset and write outputs.
    pub role_arn: String,
    /// Base model ID or ARN.
    pub base_model_identifier: String,
    /// Kind of customization.
    pub customization_type: CustomizationType,
    /// Opaque hyperparameters.
    pub hyperparameters: Hyperparameters,
    /// Training dataset location.
    pub training_data: S3Uri,
    /// Validation dataset locations.
    pub validation_data: Vec<S3Uri>,
    /// Output location.
    pub output_data: S3Uri,
    /// KMS key for the custom model.
    pub custom_model_kms_key_id: Option<String>,
    /// Tags applied to the job.
    pub job_tags: Vec<Tag>,
    /// Tags applied to the custom model.
    pub custom_model_tags: Vec<Tag>,
    /// Idempotency token. Generated when not set.
    pub client_request_token: Option<String>,
}

impl CreateCustomizationJobRequest {
    /// Create a fine-tuning request with the required fields.
    pub fn new(
        job_name: impl Into<String>,
        custom_model_name: impl Into<String>,
        role_arn: impl Into<String>,
        base_model_identifier: impl Into<String>,
        training_data: S3Uri,
        output_data: S3Uri,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            custom_model_name: custom_model_name.into(),
            role_arn: role_arn.into(),
            base_model_identifier: base_model_identifier.into(),
            customization_type: CustomizationType::FineTuning,
            hyperparameters: Hyperparameters::new(),
            training_data,
            validation_data: Vec::new(),
            output_data,
            custom_model_kms_key_id: None,
            job_tags: Vec::new(),
            custom_model_tags: Vec::new(),
            client_request_token: None,
        }
    }

    /// Set hyperparameters.
    pub fn with_hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    /// Set the customization type.
    pub fn with_customization_type(mut self, customization_type: CustomizationType) -> Self {
        self.customization_type = customization_type;
        self
    }

    /// Add a validation dataset.
    pub fn with_validation_data(mut self, uri: S3Uri) -> Self {
        self.validation_data.push(uri);
        self
    }

    /// Encrypt the custom model with a KMS key.
    pub fn with_kms_key(mut self, key_id: impl Into<String>) -> Self {
        self.custom_model_kms_key_id = Some(key_id.into());
        self
    }

    /// Tag the job.
    pub fn with_job_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.job_tags.push(Tag::new(key, value));
        self
    }

    /// Tag the custom model.
    pub fn with_model_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_model_tags.push(Tag::new(key, value));
        self
    }

    /// Set the idempotency token.
    pub fn with_client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }

    /// Wire body for `CreateModelCustomizationJob`.
    pub(crate) fn to_wire(&self) -> CreateJobBody<'_> {
        CreateJobBody {
            job_name: &self.job_name,
            custom_model_name: &self.custom_model_name,
            role_arn: &self.role_arn,
            base_model_identifier: &self.base_model_identifier,
            customization_type: self.customization_type,
            hyper_parameters: &self.hyperparameters,
            training_data_config: DataConfig {
                s3_uri: self.training_data.to_string(),
            },
            validation_data_config: if self.validation_data.is_empty() {
                None
            } else {
                Some(ValidationDataConfig {
                    validators: self
                        .validation_data
                        .iter()
                        .map(|uri| DataConfig {
                            s3_uri: uri.to_string(),
                        })
                        .collect(),
                })
            },
            output_data_config: DataConfig {
                s3_uri: self.output_data.to_string(),
            },
            custom_model_kms_key_id: self.custom_model_kms_key_id.as_deref(),
            job_tags: &self.job_tags,
            custom_model_tags: &self.custom_model_tags,
            client_request_token: self
                .client_request_token
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateJobBody<'a> {
    job_name: &'a str,
    custom_model_name: &'a str,
    role_arn: &'a str,
    base_model_identifier: &'a str,
    customization_type: CustomizationType,
    hyper_parameters: &'a Hyperparameters,
    training_data_config: DataConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_data_config: Option<ValidationDataConfig>,
    output_data_config: DataConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_model_kms_key_id: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tags")]
    job_tags: &'a [Tag],
    #[serde(skip_serializing_if = "no_tags")]
    custom_model_tags: &'a [Tag],
    client_request_token: String,
}

fn no_tags(tags: &&[Tag]) -> bool {
    tags.is_empty()
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An S3 data location as it appears in job descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    /// `s3://` URI.
    pub s3_uri: String,
}

/// Validation dataset locations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationDataConfig {
    /// One entry per validation dataset.
    #[serde(default)]
    pub validators: Vec<DataConfig>,
}

/// Handle to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    /// ARN of the job. Also accepted wherever a job identifier is expected.
    #[serde(rename = "jobArn")]
    pub job_arn: String,
}

impl JobHandle {
    /// Identifier to pass to status calls.
    pub fn id(&self) -> &str {
        &self.job_arn
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_arn)
    }
}

/// Job status as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Queued or training.
    InProgress,
    /// Finished; the custom model exists.
    Completed,
    /// Finished without producing a model.
    Failed,
    /// A stop was requested and is taking effect.
    Stopping,
    /// Stopped on request.
    Stopped,
    /// A status this crate does not know about.
    Unknown(String),
}

impl JobStatus {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Stopping => "Stopping",
            JobStatus::Stopped => "Stopped",
            JobStatus::Unknown(s) => s,
        }
    }

    /// True once the job will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "InProgress" => JobStatus::InProgress,
            "Completed" => JobStatus::Completed,
            "Failed" => JobStatus::Failed,
            "Stopping" => JobStatus::Stopping,
            "Stopped" => JobStatus::Stopped,
            other => JobStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::from(s.as_str()))
    }
}

/// Training loss reported for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingMetrics {
    /// Final training loss.
    pub training_loss: Option<f64>,
}

/// Loss on one validation dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorMetric {
    /// Validation loss.
    pub validation_loss: Option<f64>,
}

/// Details of a customization job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationJob {
    /// Job ARN.
    pub job_arn: String,
    /// Job name.
    pub job_name: String,
    /// Name the custom model gets.
    #[serde(default)]
    pub output_model_name: Option<String>,
    /// ARN of the custom model, once it exists.
    #[serde(default)]
    pub output_model_arn: Option<String>,
    /// Current status.
    pub status: JobStatus,
    /// Reason for failure.
    #[serde(default)]
    pub failure_message: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    /// Last status change.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Completion time.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Base model ARN.
    #[serde(default)]
    pub base_model_arn: Option<String>,
    /// Role the job runs as.
    #[serde(default)]
    pub role_arn: Option<String>,
    /// Kind of customization.
    #[serde(default)]
    pub customization_type: Option<CustomizationType>,
    /// Hyperparameters as the service recorded them.
    #[serde(default)]
    pub hyper_parameters: Hyperparameters,
    /// Training data location.
    #[serde(default)]
    pub training_data_config: Option<DataConfig>,
    /// Validation data locations.
    #[serde(default)]
    pub validation_data_config: Option<ValidationDataConfig>,
    /// Output location.
    #[serde(default)]
    pub output_data_config: Option<DataConfig>,
    /// Training metrics, once available.
    #[serde(default)]
    pub training_metrics: Option<TrainingMetrics>,
    /// Validation metrics, one per validator.
    #[serde(default)]
    pub validation_metrics: Vec<ValidatorMetric>,
}

/// One entry in a job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Job ARN.
    pub job_arn: String,
    /// Job name.
    pub job_name: String,
    /// Current status.
    pub status: JobStatus,
    /// Base model ARN.
    #[serde(default)]
    pub base_model_arn: Option<String>,
    /// Custom model name.
    #[serde(default)]
    pub custom_model_name: Option<String>,
    /// Custom model ARN.
    #[serde(default)]
    pub custom_model_arn: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    /// Last status change.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Completion time.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Kind of customization.
    #[serde(default)]
    pub customization_type: Option<CustomizationType>,
}

/// Sort order for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "Ascending",
            SortOrder::Descending => "Descending",
        }
    }
}

/// Filters for listing jobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListJobsRequest {
    /// Only jobs in this status.
    pub status_equals: Option<JobStatus>,
    /// Only jobs whose name contains this substring.
    pub name_contains: Option<String>,
    /// Only jobs created after this time.
    pub creation_time_after: Option<DateTime<Utc>>,
    /// Only jobs created before this time.
    pub creation_time_before: Option<DateTime<Utc>>,
    /// Page size.
    pub max_results: Option<u32>,
    /// Continuation token from a previous page.
    pub next_token: Option<String>,
    /// Sort by creation time.
    pub sort_order: Option<SortOrder>,
}

impl ListJobsRequest {
    /// Create an unfiltered request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status_equals = Some(status);
        self
    }

    /// Filter by name substring.
    pub fn with_name_contains(mut self, name: impl Into<String>) -> Self {
        self.name_contains = Some(name.into());
        self
    }

    /// Set the page size.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Continue from a previous page.
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// Sort by creation time.
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }

    /// Query parameters in wire form.
    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = &self.status_equals {
            params.push(("statusEquals", status.as_str().to_string()));
        }
        if let Some(name) = &self.name_contains {
            params.push(("nameContains", name.clone()));
        }
        if let Some(after) = &self.creation_time_after {
            params.push(("creationTimeAfter", after.to_rfc3339()));
        }
        if let Some(before) = &self.creation_time_before {
            params.push(("creationTimeBefore", before.to_rfc3339()));
        }
        if let Some(max) = self.max_results {
            params.push(("maxResults", max.to_string()));
        }
        if let Some(token) = &self.next_token {
            params.push(("nextToken", token.clone()));
        }
        if let Some(order) = self.sort_order {
            params.push(("sortBy", "CreationTime".to_string()));
            params.push(("sortOrder", order.as_str().to_string()));
        }
        params
    }
}

/// One page of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsResponse {
    /// Jobs on this page.
    #[serde(default, rename = "modelCustomizationJobSummaries")]
    pub jobs: Vec<JobSummary>,
    /// Token for the next page.
    #[serde(default)]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreateCustomizationJobRequest {
        CreateCustomizationJobRequest::new(
            "support-ft-1",
            "support-model-1",
            "arn:aws:iam::123456789012:role/BedrockFineTune",
            "anthropic.claude-3-haiku-20240307-v1:0:200k",
            S3Uri::new("datasets", "train.jsonl"),
            S3Uri::new("datasets", "output/"),
        )
    }

    #[test]
    fn test_hyperparameter_setters() {
        let hp = Hyperparameters::new()
            .epoch_count(5)
            .batch_size(4)
            .learning_rate_multiplier("1.0");

        assert_eq!(
            serde_json::to_value(&hp).unwrap(),
            json!({"epochCount": "5", "batchSize": "4", "learningRateMultiplier": "1.0"})
        );
        assert_eq!(hp.get("batchSize"), Some("4"));
        assert_eq!(hp.len(), 3);
    }

    #[test]
    fn test_wire_body_shape() {
        let req = request()
            .with_hyperparameters(Hyperparameters::new().epoch_count(2))
            .with_client_request_token("token-1");
        let body = serde_json::to_value(req.to_wire()).unwrap();

        assert_eq!(
            body,
            json!({
                "jobName": "support-ft-1",
                "customModelName": "support-model-1",
                "roleArn": "arn:aws:iam::123456789012:role/BedrockFineTune",
                "baseModelIdentifier": "anthropic.claude-3-haiku-20240307-v1:0:200k",
                "customizationType": "FINE_TUNING",
                "hyperParameters": {"epochCount": "2"},
                "trainingDataConfig": {"s3Uri": "s3://datasets/train.jsonl"},
                "outputDataConfig": {"s3Uri": "s3://datasets/output/"},
                "clientRequestToken": "token-1"
            })
        );
    }

    #[test]
    fn test_wire_body_optional_fields() {
        let req = request()
            .with_validation_data(S3Uri::new("datasets", "val.jsonl"))
            .with_kms_key("alias/models")
            .with_job_tag("team", "support");
        let body = serde_json::to_value(req.to_wire()).unwrap();

        assert_eq!(
            body["validationDataConfig"],
            json!({"validators": [{"s3Uri": "s3://datasets/val.jsonl"}]})
        );
        assert_eq!(body["customModelKmsKeyId"], "alias/models");
        assert_eq!(body["jobTags"], json!([{"key": "team", "value": "support"}]));
        assert!(body.get("customModelTags").is_none());
        assert!(uuid::Uuid::parse_str(body["clientRequestToken"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_job_status() {
        assert_eq!(JobStatus::from("Completed"), JobStatus::Completed);
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(!JobStatus::Stopping.is_terminal());

        let unknown: JobStatus = serde_json::from_str("\"Queued\"").unwrap();
        assert_eq!(unknown, JobStatus::Unknown("Queued".into()));
        assert!(!unknown.is_terminal());
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"Queued\"");
    }

    #[test]
    fn test_list_query_params() {
        let params = ListJobsRequest::new()
            .with_status(JobStatus::InProgress)
            .with_max_results(10)
            .with_sort_order(SortOrder::Descending)
            .query_params();

        assert_eq!(
            params,
            vec![
                ("statusEquals", "InProgress".to_string()),
                ("maxResults", "10".to_string()),
                ("sortBy", "CreationTime".to_string()),
                ("sortOrder", "Descending".to_string()),
            ]
        );
    }

    #[test]
    fn test_customization_job_deserialize() {
        let job: CustomizationJob = serde_json::from_value(json!({
            "jobArn": "arn:aws:bedrock:us-east-1:123456789012:model-customization-job/abc",
            "jobName": "support-ft-1",
            "status": "Failed",
            "failureMessage": "Invalid hyperparameter",
            "creationTime": "2024-05-01T10:00:00Z",
            "hyperParameters": {"epochCount": "5"},
            "trainingMetrics": {"trainingLoss": 0.42},
            "validationMetrics": [{"validationLoss": 0.5}]
        }))
        .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_message.as_deref(), Some("Invalid hyperparameter"));
        assert_eq!(job.hyper_parameters.get("epochCount"), Some("5"));
        assert_eq!(job.training_metrics.unwrap().training_loss, Some(0.42));
        assert_eq!(job.validation_metrics.len(), 1);
    }
}
