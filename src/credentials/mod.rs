//! AWS credentials resolution.
//!
//! Credentials come from the usual AWS sources, tried in order by
//! [`ChainCredentialsProvider`]: environment variables, then the shared
//! credentials file.

use crate::error::{BedrockError, CredentialsError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    /// Attach a session token (temporary credentials).
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Attach an expiration time.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token if present.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Get the expiration time if present.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Check if credentials are expired.
    pub fn is_expired(&self) -> bool {
        self.expiration.map(|exp| exp <= Utc::now()).unwrap_or(false)
    }

    /// Check if credentials will expire within the given duration.
    pub fn will_expire_within(&self, duration: Duration) -> bool {
        self.expiration
            .map(|exp| exp <= Utc::now() + duration)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials.
    async fn get_credentials(&self) -> Result<AwsCredentials, BedrockError>;

    /// Provider name for debugging.
    fn name(&self) -> &'static str;
}

/// Static credentials provider.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, BedrockError> {
        if self.credentials.is_expired() {
            return Err(CredentialsError::Expired {
                expiration: self
                    .credentials
                    .expiration()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default(),
            }
            .into());
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Environment credentials provider (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`).
#[derive(Debug, Default)]
pub struct EnvCredentialsProvider;

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, BedrockError> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| CredentialsError::NotFound)?;
        let secret_key =
            std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| CredentialsError::NotFound)?;

        let credentials = AwsCredentials::new(access_key, secret_key);
        Ok(match std::env::var("AWS_SESSION_TOKEN") {
            Ok(token) if !token.is_empty() => credentials.with_session_token(token),
            _ => credentials,
        })
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

/// Shared credentials file provider (`~/.aws/credentials`).
#[derive(Debug)]
pub struct ProfileCredentialsProvider {
    profile: String,
    path: Option<PathBuf>,
}

impl ProfileCredentialsProvider {
    /// Use `AWS_PROFILE` (or `default`) from the standard file location.
    pub fn new() -> Self {
        Self {
            profile: std::env::var("AWS_PROFILE").unwrap_or_else(|_| "default".to_string()),
            path: None,
        }
    }

    /// Use a specific profile name.
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            path: None,
        }
    }

    /// Read from an explicit file instead of the standard location.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn credentials_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".aws").join("credentials"))
    }

    fn parse_credentials(&self, content: &str) -> Result<AwsCredentials, BedrockError> {
        let header = format!("[{}]", self.profile);
        let mut in_profile = false;
        let mut access_key = None;
        let mut secret_key = None;
        let mut session_token = None;

        for line in content.lines().map(str::trim) {
            if line.starts_with('[') {
                in_profile = line == header;
                continue;
            }
            if !in_profile || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_string();
                match key.trim() {
                    "aws_access_key_id" => access_key = Some(value),
                    "aws_secret_access_key" => secret_key = Some(value),
                    "aws_session_token" => session_token = Some(value),
                    _ => {}
                }
            }
        }

        match (access_key, secret_key) {
            (Some(ak), Some(sk)) => {
                let credentials = AwsCredentials::new(ak, sk);
                Ok(match session_token {
                    Some(token) => credentials.with_session_token(token),
                    None => credentials,
                })
            }
            _ => Err(CredentialsError::NotFound.into()),
        }
    }
}

impl Default for ProfileCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, BedrockError> {
        let path = self.credentials_path().ok_or(CredentialsError::NotFound)?;
        if !path.exists() {
            return Err(CredentialsError::NotFound.into());
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CredentialsError::Invalid {
                message: format!("Failed to read credentials file: {}", e),
            }
        })?;

        self.parse_credentials(&content)
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}

/// Chained credentials provider that tries multiple sources and caches the result.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cached: RwLock<Option<AwsCredentials>>,
    refresh_buffer: Duration,
}

impl ChainCredentialsProvider {
    /// Environment first, then the shared credentials file.
    pub fn new() -> Self {
        Self::with_providers(vec![
            Arc::new(EnvCredentialsProvider::new()),
            Arc::new(ProfileCredentialsProvider::new()),
        ])
    }

    /// Create a chain with custom providers.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cached: RwLock::new(None),
            refresh_buffer: Duration::minutes(5),
        }
    }

    async fn try_providers(&self) -> Result<AwsCredentials, BedrockError> {
        let mut last_error = None;

        for provider in &self.providers {
            trace!(provider = provider.name(), "Trying credentials provider");
            match provider.get_credentials().await {
                Ok(creds) => {
                    debug!(provider = provider.name(), "Credentials loaded");
                    return Ok(creds);
                }
                Err(e) => {
                    trace!(provider = provider.name(), error = %e, "Provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CredentialsError::NotFound.into()))
    }
}

impl Default for ChainCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, BedrockError> {
        if let Some(cached) = self.cached.read().as_ref() {
            if !cached.will_expire_within(self.refresh_buffer) {
                return Ok(cached.clone());
            }
        }

        let creds = self.try_providers().await?;
        *self.cached.write() = Some(creds.clone());
        Ok(creds)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
