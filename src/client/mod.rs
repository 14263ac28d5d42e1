//! Client wiring: one configuration, one transport, one signer per service.

use crate::config::BedrockConfig;
use crate::credentials::{AwsCredentials, ChainCredentialsProvider, CredentialsProvider, StaticCredentialsProvider};
use crate::dataset::DatasetPreparer;
use crate::error::BedrockError;
use crate::services::{
    CustomizationService, CustomizationServiceImpl, ProvisioningService, ProvisioningServiceImpl,
    RuntimeService, RuntimeServiceImpl, ServiceContext, StorageService, StorageServiceImpl,
};
use crate::signing::SigV4Signer;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::workflow::FineTuneWorkflow;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Entry point to every operation of the crate.
pub trait BedrockClient: Send + Sync {
    /// S3 uploads.
    fn storage(&self) -> &dyn StorageService;

    /// Dataset validation and upload.
    fn datasets(&self) -> &DatasetPreparer;

    /// Customization jobs.
    fn customization(&self) -> &dyn CustomizationService;

    /// Provisioned throughput.
    fn provisioning(&self) -> &dyn ProvisioningService;

    /// Model invocation.
    fn runtime(&self) -> &dyn RuntimeService;

    /// Client configuration.
    fn config(&self) -> &BedrockConfig;
}

/// Default [`BedrockClient`]; services are created on first use.
pub struct BedrockClientImpl {
    config: Arc<BedrockConfig>,
    transport: Arc<dyn HttpTransport>,
    credentials_provider: Arc<dyn CredentialsProvider>,

    storage: OnceCell<Arc<StorageServiceImpl>>,
    datasets: OnceCell<DatasetPreparer>,
    customization: OnceCell<Arc<CustomizationServiceImpl>>,
    provisioning: OnceCell<ProvisioningServiceImpl>,
    runtime: OnceCell<RuntimeServiceImpl>,
}

impl BedrockClientImpl {
    /// Create a client from its parts.
    pub fn new(
        config: BedrockConfig,
        transport: Arc<dyn HttpTransport>,
        credentials_provider: Arc<dyn CredentialsProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            credentials_provider,
            storage: OnceCell::new(),
            datasets: OnceCell::new(),
            customization: OnceCell::new(),
            provisioning: OnceCell::new(),
            runtime: OnceCell::new(),
        }
    }

    /// Create a builder.
    pub fn builder() -> BedrockClientBuilder {
        BedrockClientBuilder::new()
    }

    fn context(&self, signer: SigV4Signer) -> ServiceContext {
        ServiceContext::new(self.config.clone(), self.transport.clone(), Arc::new(signer))
    }

    fn storage_impl(&self) -> &Arc<StorageServiceImpl> {
        self.storage.get_or_init(|| {
            Arc::new(StorageServiceImpl::new(self.context(SigV4Signer::s3(
                self.credentials_provider.clone(),
                self.config.region.clone(),
            ))))
        })
    }

    fn customization_impl(&self) -> &Arc<CustomizationServiceImpl> {
        self.customization.get_or_init(|| {
            Arc::new(CustomizationServiceImpl::new(self.context(SigV4Signer::bedrock(
                self.credentials_provider.clone(),
                self.config.region.clone(),
            ))))
        })
    }

    /// Prepare, upload and submit in one call.
    pub fn workflow(&self) -> FineTuneWorkflow {
        FineTuneWorkflow::new(
            self.storage_impl().clone(),
            self.customization_impl().clone(),
        )
    }
}

impl BedrockClient for BedrockClientImpl {
    fn storage(&self) -> &dyn StorageService {
        self.storage_impl().as_ref()
    }

    fn datasets(&self) -> &DatasetPreparer {
        self.datasets
            .get_or_init(|| DatasetPreparer::new(self.storage_impl().clone()))
    }

    fn customization(&self) -> &dyn CustomizationService {
        self.customization_impl().as_ref()
    }

    fn provisioning(&self) -> &dyn ProvisioningService {
        self.provisioning.get_or_init(|| {
            ProvisioningServiceImpl::new(self.context(SigV4Signer::bedrock(
                self.credentials_provider.clone(),
                self.config.region.clone(),
            )))
        })
    }

    fn runtime(&self) -> &dyn RuntimeService {
        self.runtime.get_or_init(|| {
            RuntimeServiceImpl::new(self.context(SigV4Signer::runtime(
                self.credentials_provider.clone(),
                self.config.region.clone(),
            )))
        })
    }

    fn config(&self) -> &BedrockConfig {
        &self.config
    }
}

impl std::fmt::Debug for BedrockClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockClientImpl")
            .field("config", &self.config)
            .field("credentials", &self.credentials_provider.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BedrockClientImpl`].
#[derive(Default)]
pub struct BedrockClientBuilder {
    config: Option<BedrockConfig>,
    from_env: bool,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl BedrockClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: BedrockConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Use fixed credentials.
    pub fn credentials(self, credentials: AwsCredentials) -> Self {
        self.credentials_provider(Arc::new(StaticCredentialsProvider::new(credentials)))
    }

    /// Use a custom credentials provider. Defaults to the environment/profile chain.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<BedrockClientImpl, BedrockError> {
        let config = match self.config {
            Some(config) => config,
            None if self.from_env => BedrockConfig::builder().from_env().build()?,
            None => BedrockConfig::default(),
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.timeout)?),
        };

        let credentials_provider = self
            .credentials_provider
            .unwrap_or_else(|| Arc::new(ChainCredentialsProvider::new()));

        Ok(BedrockClientImpl::new(config, transport, credentials_provider))
    }
}
