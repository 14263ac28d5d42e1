//! Model invocation on Bedrock Runtime.

use super::{encode_segment, parse_json, to_json, ServiceContext};
use crate::error::{BedrockError, ResponseError};
use crate::types::{MessagesRequest, MessagesResponse};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Model invocation.
#[async_trait]
pub trait RuntimeService: Send + Sync {
    /// Invoke a model (ID or provisioned model ARN) with a messages payload.
    async fn invoke(
        &self,
        model_ref: &str,
        request: MessagesRequest,
    ) -> Result<MessagesResponse, BedrockError>;

    /// Invoke and return the first text block.
    async fn invoke_text(
        &self,
        model_ref: &str,
        request: MessagesRequest,
    ) -> Result<String, BedrockError> {
        let response = self.invoke(model_ref, request).await?;
        response.first_text().map(String::from).ok_or_else(|| {
            ResponseError::NoTextContent {
                model_id: model_ref.to_string(),
            }
            .into()
        })
    }
}

/// Bedrock Runtime implementation of [`RuntimeService`].
pub struct RuntimeServiceImpl {
    context: ServiceContext,
}

impl RuntimeServiceImpl {
    pub(crate) fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    fn invoke_url(&self, model_ref: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.context.config.runtime_endpoint(),
            encode_segment(model_ref)
        )
    }
}

#[async_trait]
impl RuntimeService for RuntimeServiceImpl {
    #[instrument(skip(self, request), fields(max_tokens = request.max_tokens))]
    async fn invoke(
        &self,
        model_ref: &str,
        request: MessagesRequest,
    ) -> Result<MessagesResponse, BedrockError> {
        let body = to_json("InvokeModel", &request)?;
        debug!(
            turns = request.messages.len(),
            body_size = body.len(),
            "Invoking model"
        );

        let response = self
            .context
            .execute_json("POST", self.invoke_url(model_ref), Some(body))
            .await?;
        let parsed: MessagesResponse = parse_json("InvokeModel", &response.body)?;

        debug!(
            blocks = parsed.content.len(),
            stop_reason = ?parsed.stop_reason,
            "Model responded"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BedrockConfig;
    use crate::mocks::{MockCredentialsProvider, MockResponse, MockTransport, TestFixtures};
    use crate::signing::SigV4Signer;
    use serde_json::json;
    use std::sync::Arc;

    fn service(transport: Arc<MockTransport>) -> RuntimeServiceImpl {
        let config = Arc::new(BedrockConfig::default());
        let signer = Arc::new(SigV4Signer::runtime(
            Arc::new(MockCredentialsProvider::new()),
            config.region.clone(),
        ));
        RuntimeServiceImpl::new(ServiceContext::new(config, transport, signer))
    }

    #[tokio::test]
    async fn test_invoke_text_single_turn() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(
            TestFixtures::messages_response("Refund issued."),
        )]));
        let runtime = service(transport.clone());

        let text = runtime
            .invoke_text("anthropic.claude-3-haiku-20240307-v1:0", MessagesRequest::user(1000, "Status?"))
            .await
            .unwrap();
        assert_eq!(text, "Refund issued.");

        let sent = transport.last_request().unwrap();
        assert_eq!(
            sent.url,
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/invoke"
        );
        let body: serde_json::Value = serde_json::from_str(sent.body_str().unwrap()).unwrap();
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 1000);
        assert!(sent
            .get_header("authorization")
            .unwrap()
            .contains("/bedrock-runtime/aws4_request"));
    }

    #[tokio::test]
    async fn test_invoke_provisioned_arn_is_encoded() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(
            TestFixtures::messages_response("ok"),
        )]));
        let runtime = service(transport.clone());

        runtime
            .invoke(
                "arn:aws:bedrock:us-east-1:123456789012:provisioned-model/pt1",
                MessagesRequest::user(10, "hi"),
            )
            .await
            .unwrap();

        assert!(transport
            .last_request()
            .unwrap()
            .url
            .contains("/model/arn%3Aaws%3Abedrock%3Aus-east-1%3A123456789012%3Aprovisioned-model%2Fpt1/invoke"));
    }

    #[tokio::test]
    async fn test_invoke_text_without_text_block() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::json(
            json!({"content": [{"type": "tool_use", "id": "t", "name": "x", "input": {}}]}),
        )]));

        let err = service(transport)
            .invoke_text("model", MessagesRequest::user(10, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BedrockError::Response(ResponseError::NoTextContent { .. })
        ));
    }

    #[tokio::test]
    async fn test_invoke_throttled_unchanged() {
        let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::aws_error(
            429,
            "ThrottlingException",
            "Too many requests",
        )]));

        let err = service(transport.clone())
            .invoke("model", MessagesRequest::user(10, "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some("ThrottlingException"));
        assert_eq!(transport.request_count(), 1);
    }
}
