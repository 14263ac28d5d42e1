//! Provisioned throughput for custom models.

use super::{encode_segment, parse_json, to_json, ServiceContext};
use crate::error::BedrockError;
use crate::types::{
    CreateProvisionedResponse, ProvisionedStatus, ProvisionedThroughput, ProvisionedThroughputRequest,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

/// Provisioned throughput operations.
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Allocate throughput; returns the provisioned model ARN.
    async fn create(&self, request: ProvisionedThroughputRequest) -> Result<String, BedrockError>;

    /// Describe a provisioned model by name or ARN.
    async fn get(&self, provisioned_model_id: &str) -> Result<ProvisionedThroughput, BedrockError>;

    /// Release a provisioned model.
    async fn delete(&self, provisioned_model_id: &str) -> Result<(), BedrockError>;
}

/// Bedrock implementation of [`ProvisioningService`].
pub struct ProvisioningServiceImpl {
    context: ServiceContext,
}

impl ProvisioningServiceImpl {
    pub(crate) fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    fn base_url(&self) -> String {
        format!("{}/provisioned-model-throughput", self.context.config.api_endpoint())
    }
}

#[async_trait]
impl ProvisioningService for ProvisioningServiceImpl {
    #[instrument(skip(self, request), fields(model_id = %request.model_id, units = request.model_units))]
    async fn create(&self, request: ProvisionedThroughputRequest) -> Result<String, BedrockError> {
        let body = to_json("CreateProvisionedModelThroughput", &request)?;
        let response = self
            .context
            .execute_json("POST", self.base_url(), Some(body))
            .await?;
        let created: CreateProvisionedResponse =
            parse_json("CreateProvisionedModelThroughput", &response.body)?;

        info!(arn = %created.provisioned_model_arn, "Provisioned throughput requested");
        Ok(created.provisioned_model_arn)
    }

    #[instrument(skip(self))]
    async fn get(&self, provisioned_model_id: &str) -> Result<ProvisionedThroughput, BedrockError> {
        let url = format!("{}/{}", self.base_url(), encode_segment(provisioned_model_id));
        let response = self.context.execute_json("GET", url, None).await?;
        let throughput: ProvisionedThroughput =
            parse_json("GetProvisionedModelThroughput", &response.body)?;

        match &throughput.status {
            ProvisionedStatus::Unknown(status) => {
                warn!(provisioned_model = provisioned_model_id, %status, "Unrecognized provisioned throughput status")
            }
            status => debug!(%status, "Provisioned throughput status"),
        }
        Ok(throughput)
    }

    #[instrument(skip(self))]
    async fn delete(&self, provisioned_model_id: &str) -> Result<(), BedrockError> {
        let url = format!("{}/{}", self.base_url(), encode_segment(provisioned_model_id));
        self.context.execute_json("DELETE", url, None).await?;
        info!("Provisioned throughput deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BedrockConfig;
    use crate::mocks::{MockCredentialsProvider, MockResponse, MockTransport};
    use crate::signing::SigV4Signer;
    use serde_json::json;
    use std::sync::Arc;

    const ARN: &str = "arn:aws:bedrock:us-east-1:123456789012:provisioned-model/pt1";

    fn service(transport: Arc<MockTransport>) -> ProvisioningServiceImpl {
        let config = Arc::new(BedrockConfig::default());
        let signer = Arc::new(SigV4Signer::bedrock(
            Arc::new(MockCredentialsProvider::new()),
            config.region.clone(),
        ));
        ProvisioningServiceImpl::new(ServiceContext::new(config, transport, signer))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let transport = Arc::new(MockTransport::with_responses(vec![
            MockResponse::json(json!({ "provisionedModelArn": ARN })),
            MockResponse::json(json!({
                "provisionedModelArn": ARN,
                "provisionedModelName": "support-pt",
                "status": "Creating",
                "modelArn": "arn:aws:bedrock:us-east-1:123456789012:custom-model/support-model-1"
            })),
        ]));
        let provisioning = service(transport.clone());

        let arn = provisioning
            .create(ProvisionedThroughputRequest::new("support-pt", "support-model-1", 1))
            .await
            .unwrap();
        assert_eq!(arn, ARN);

        let pt = provisioning.get(&arn).await.unwrap();
        assert_eq!(pt.status, ProvisionedStatus::Creating);
        assert!(!pt.status.is_ready());

        let requests = transport.requests();
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].url.ends_with("/provisioned-model-throughput"));
        assert_eq!(requests[1].method, "GET");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_unknown_status_is_kept_and_warned() {
        use tracing::instrument::WithSubscriber;

        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(json!({
            "provisionedModelArn": ARN,
            "provisionedModelName": "support-pt",
            "status": "Migrating",
            "modelArn": "arn:aws:bedrock:us-east-1:123456789012:custom-model/support-model-1"
        }))]));
        let provisioning = service(transport);

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let pt = provisioning.get(ARN).with_subscriber(subscriber).await.unwrap();

        assert_eq!(pt.status, ProvisionedStatus::Unknown("Migrating".into()));
        assert!(!pt.status.is_ready());

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Unrecognized provisioned throughput status"));
        assert!(output.contains("Migrating"));
    }

    #[tokio::test]
    async fn test_delete_error_passes_through() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::aws_error(
            404,
            "ResourceNotFoundException",
            "Provisioned model not found",
        )]));

        let err = service(transport.clone()).delete("support-pt").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.error_code(), Some("ResourceNotFoundException"));
        assert_eq!(transport.last_request().unwrap().method, "DELETE");
    }
}
