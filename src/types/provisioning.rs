//! Provisioned throughput types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Term commitment for provisioned throughput. No commitment when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentDuration {
    /// One month term.
    OneMonth,
    /// Six month term.
    SixMonths,
}

/// Request to make a custom model invocable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedThroughputRequest {
    /// Number of model units to allocate.
    pub model_units: u32,
    /// Name of the provisioned model.
    pub provisioned_model_name: String,
    /// Custom model name or ARN.
    pub model_id: String,
    /// Optional term commitment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_duration: Option<CommitmentDuration>,
    /// Idempotency token.
    pub client_request_token: String,
}

impl ProvisionedThroughputRequest {
    /// Create a no-commitment request with a fresh idempotency token.
    pub fn new(
        provisioned_model_name: impl Into<String>,
        model_id: impl Into<String>,
        model_units: u32,
    ) -> Self {
        Self {
            model_units,
            provisioned_model_name: provisioned_model_name.into(),
            model_id: model_id.into(),
            commitment_duration: None,
            client_request_token: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Commit to a term.
    pub fn with_commitment(mut self, duration: CommitmentDuration) -> Self {
        self.commitment_duration = Some(duration);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateProvisionedResponse {
    pub provisioned_model_arn: String,
}

/// Provisioned throughput status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProvisionedStatus {
    /// Capacity is being allocated.
    Creating,
    /// Ready for invocation.
    InService,
    /// Being resized or re-pointed.
    Updating,
    /// Allocation failed.
    Failed,
    /// A status this crate does not know about.
    Unknown(String),
}

impl ProvisionedStatus {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            ProvisionedStatus::Creating => "Creating",
            ProvisionedStatus::InService => "InService",
            ProvisionedStatus::Updating => "Updating",
            ProvisionedStatus::Failed => "Failed",
            ProvisionedStatus::Unknown(s) => s,
        }
    }

    /// True when the model can be invoked.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisionedStatus::InService)
    }
}

impl From<&str> for ProvisionedStatus {
    fn from(s: &str) -> Self {
        match s {
            "Creating" => ProvisionedStatus::Creating,
            "InService" => ProvisionedStatus::InService,
            "Updating" => ProvisionedStatus::Updating,
            "Failed" => ProvisionedStatus::Failed,
            other => ProvisionedStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ProvisionedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProvisionedStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ProvisionedStatus::from(s.as_str()))
    }
}

impl Serialize for ProvisionedStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Details of a provisioned model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedThroughput {
    /// ARN to pass as the model reference when invoking.
    pub provisioned_model_arn: String,
    /// Name.
    pub provisioned_model_name: String,
    /// Current status.
    pub status: ProvisionedStatus,
    /// Model being served.
    #[serde(default)]
    pub model_arn: Option<String>,
    /// Requested model units.
    #[serde(default)]
    pub desired_model_units: Option<u32>,
    /// Allocated model units.
    #[serde(default)]
    pub model_units: Option<u32>,
    /// Reason for failure.
    #[serde(default)]
    pub failure_message: Option<String>,
    /// Term commitment.
    #[serde(default)]
    pub commitment_duration: Option<CommitmentDuration>,
    /// Creation time.
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    /// Last change.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = ProvisionedThroughputRequest::new("support-pt", "support-model-1", 1)
            .with_commitment(CommitmentDuration::OneMonth);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["modelUnits"], 1);
        assert_eq!(body["provisionedModelName"], "support-pt");
        assert_eq!(body["modelId"], "support-model-1");
        assert_eq!(body["commitmentDuration"], "OneMonth");
        assert!(!request.client_request_token.is_empty());
    }

    #[test]
    fn test_status_parsing() {
        let pt: ProvisionedThroughput = serde_json::from_value(json!({
            "provisionedModelArn": "arn:aws:bedrock:us-east-1:123456789012:provisioned-model/xyz",
            "provisionedModelName": "support-pt",
            "status": "InService",
            "modelUnits": 1
        }))
        .unwrap();
        assert!(pt.status.is_ready());

        assert_eq!(
            ProvisionedStatus::from("Deleting"),
            ProvisionedStatus::Unknown("Deleting".into())
        );
        assert!(!ProvisionedStatus::Creating.is_ready());
    }
}
