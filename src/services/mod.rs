//! Service implementations.
//!
//! Each service is a trait (the seam callers and tests mock) plus an
//! implementation that signs requests, sends them through the transport and
//! passes remote errors back unchanged.

mod customization;
mod provisioning;
mod runtime;
mod storage;

pub use customization::{CustomizationService, CustomizationServiceImpl};
pub use provisioning::{ProvisioningService, ProvisioningServiceImpl};
pub use runtime::{RuntimeService, RuntimeServiceImpl};
pub use storage::{PutObjectOutput, PutObjectRequest, StorageService, StorageServiceImpl};

use crate::config::BedrockConfig;
use crate::error::{map_json_error, BedrockError, ResponseError};
use crate::signing::AwsSigner;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Configuration, transport and signer shared by one service.
#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) config: Arc<BedrockConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
}

impl ServiceContext {
    pub(crate) fn new(
        config: Arc<BedrockConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
    ) -> Self {
        Self {
            config,
            transport,
            signer,
        }
    }

    /// Sign and send. Non-2xx responses are returned as-is.
    pub(crate) async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BedrockError> {
        let signed = self.signer.sign(request).await?;
        self.transport.send(signed).await
    }

    /// Sign and send a JSON request; non-2xx responses become service errors.
    pub(crate) async fn execute_json(
        &self,
        method: &str,
        url: String,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, BedrockError> {
        let mut request = HttpRequest::new(method, url)
            .with_header("accept", "application/json");
        if let Some(body) = body {
            request = request
                .with_header("content-type", "application/json")
                .with_body(body);
        }

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(map_json_error(self.signer.service(), &response));
        }
        Ok(response)
    }
}

/// Decode a successful JSON body.
pub(crate) fn parse_json<T: DeserializeOwned>(
    operation: &'static str,
    body: &[u8],
) -> Result<T, BedrockError> {
    serde_json::from_slice(body).map_err(|e| {
        ResponseError::Parse {
            operation,
            message: e.to_string(),
        }
        .into()
    })
}

/// Encode a request body.
pub(crate) fn to_json<T: serde::Serialize>(
    operation: &'static str,
    value: &T,
) -> Result<Vec<u8>, BedrockError> {
    serde_json::to_vec(value).map_err(|e| {
        ResponseError::Parse {
            operation,
            message: format!("failed to encode request: {}", e),
        }
        .into()
    })
}

/// Percent-encode a single path segment (job ARNs, model IDs).
pub(crate) fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
