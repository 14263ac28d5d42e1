//! Client configuration.

use crate::error::{BedrockError, ConfigurationError};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the Bedrock fine-tuning client.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    /// AWS region.
    pub region: String,
    /// Endpoint override for the Bedrock control plane.
    pub bedrock_endpoint: Option<String>,
    /// Endpoint override for Bedrock Runtime.
    pub runtime_endpoint: Option<String>,
    /// Endpoint override for S3. Forces path-style addressing.
    pub s3_endpoint: Option<String>,
    /// Request timeout applied by the transport.
    pub timeout: Duration,
}

impl BedrockConfig {
    /// Create a new config builder.
    pub fn builder() -> BedrockConfigBuilder {
        BedrockConfigBuilder::new()
    }

    /// Bedrock control plane endpoint (customization jobs, provisioned throughput).
    pub fn api_endpoint(&self) -> String {
        match &self.bedrock_endpoint {
            Some(custom) => custom.trim_end_matches('/').to_string(),
            None => format!("https://bedrock.{}.amazonaws.com", self.region),
        }
    }

    /// Bedrock Runtime endpoint (model invocation).
    pub fn runtime_endpoint(&self) -> String {
        match &self.runtime_endpoint {
            Some(custom) => custom.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }

    /// URL of an S3 object. Virtual-hosted style unless an endpoint override is set.
    ///
    /// Keys with a `.` or `..` segment are rejected.
    pub fn s3_object_url(&self, bucket: &str, key: &str) -> Result<String, BedrockError> {
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "key".to_string(),
                message: format!("'{}' contains a '.' or '..' path segment", key),
            }
            .into());
        }

        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(match &self.s3_endpoint {
            Some(custom) => format!("{}/{}/{}", custom.trim_end_matches('/'), bucket, encoded_key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, encoded_key),
        })
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bedrock_endpoint: None,
            runtime_endpoint: None,
            s3_endpoint: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Builder for BedrockConfig.
#[derive(Debug, Default)]
pub struct BedrockConfigBuilder {
    region: Option<String>,
    bedrock_endpoint: Option<String>,
    runtime_endpoint: Option<String>,
    s3_endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl BedrockConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Point all three services at one endpoint (e.g. a local emulator).
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.bedrock_endpoint = Some(url.clone());
        self.runtime_endpoint = Some(url.clone());
        self.s3_endpoint = Some(url);
        self
    }

    /// Override the Bedrock control plane endpoint.
    pub fn bedrock_endpoint(mut self, url: impl Into<String>) -> Self {
        self.bedrock_endpoint = Some(url.into());
        self
    }

    /// Override the Bedrock Runtime endpoint.
    pub fn runtime_endpoint(mut self, url: impl Into<String>) -> Self {
        self.runtime_endpoint = Some(url.into());
        self
    }

    /// Override the S3 endpoint.
    pub fn s3_endpoint(mut self, url: impl Into<String>) -> Self {
        self.s3_endpoint = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill unset values from environment variables.
    pub fn from_env(mut self) -> Self {
        if self.region.is_none() {
            self.region = env_var("AWS_REGION").or_else(|| env_var("AWS_DEFAULT_REGION"));
        }

        let shared = env_var("AWS_ENDPOINT_URL");
        if self.bedrock_endpoint.is_none() {
            self.bedrock_endpoint = env_var("AWS_ENDPOINT_URL_BEDROCK").or_else(|| shared.clone());
        }
        if self.runtime_endpoint.is_none() {
            self.runtime_endpoint =
                env_var("AWS_ENDPOINT_URL_BEDROCK_RUNTIME").or_else(|| shared.clone());
        }
        if self.s3_endpoint.is_none() {
            self.s3_endpoint = env_var("AWS_ENDPOINT_URL_S3").or(shared);
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<BedrockConfig, BedrockError> {
        let region = self.region.ok_or(ConfigurationError::MissingRegion)?;

        if !is_valid_region(&region) {
            return Err(ConfigurationError::InvalidRegion { region }.into());
        }

        for (field, endpoint) in [
            ("bedrock_endpoint", &self.bedrock_endpoint),
            ("runtime_endpoint", &self.runtime_endpoint),
            ("s3_endpoint", &self.s3_endpoint),
        ] {
            if let Some(url) = endpoint {
                url::Url::parse(url).map_err(|e| ConfigurationError::InvalidConfiguration {
                    field: field.to_string(),
                    message: format!("'{}' is not a valid URL: {}", url, e),
                })?;
            }
        }

        Ok(BedrockConfig {
            region,
            bedrock_endpoint: self.bedrock_endpoint,
            runtime_endpoint: self.runtime_endpoint,
            s3_endpoint: self.s3_endpoint,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Validate AWS region format, e.g. `us-east-1`, `eu-west-2`, `us-gov-west-1`.
fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return region == "localhost";
    }

    let valid_prefixes = ["us", "eu", "ap", "sa", "ca", "me", "af", "cn", "il", "mx"];
    valid_prefixes.contains(&parts[0])
        && parts
            .last()
            .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
}
