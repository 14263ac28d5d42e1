//! AWS Signature V4 signing.
//!
//! One signer per signing name: `bedrock` for the control plane,
//! `bedrock-runtime` for invocation and `s3` for dataset uploads. S3 signs the
//! URI path as sent; the other services sign it encoded a second time.

use crate::credentials::{AwsCredentials, CredentialsProvider};
use crate::error::{BedrockError, ConfigurationError};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signing name of the Bedrock control plane.
pub const BEDROCK_SERVICE: &str = "bedrock";
/// Signing name of the Bedrock runtime.
pub const BEDROCK_RUNTIME_SERVICE: &str = "bedrock-runtime";
/// Signing name of S3.
pub const S3_SERVICE: &str = "s3";

/// Trait for AWS request signers.
#[async_trait]
pub trait AwsSigner: Send + Sync {
    /// Sign a request, returning it with authorization headers added.
    async fn sign(&self, request: HttpRequest) -> Result<HttpRequest, BedrockError>;

    /// Signing name of the target service.
    fn service(&self) -> &str;
}

/// AWS Signature V4 signer.
pub struct SigV4Signer {
    credentials_provider: Arc<dyn CredentialsProvider>,
    region: String,
    service: String,
    double_encode_path: bool,
}

impl SigV4Signer {
    /// Signer for an arbitrary service.
    pub fn new(
        credentials_provider: Arc<dyn CredentialsProvider>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        let service = service.into();
        Self {
            credentials_provider,
            region: region.into(),
            double_encode_path: service != S3_SERVICE,
            service,
        }
    }

    /// Signer for the Bedrock control plane (customization jobs, provisioned throughput).
    pub fn bedrock(credentials_provider: Arc<dyn CredentialsProvider>, region: impl Into<String>) -> Self {
        Self::new(credentials_provider, region, BEDROCK_SERVICE)
    }

    /// Signer for Bedrock Runtime (model invocation).
    pub fn runtime(credentials_provider: Arc<dyn CredentialsProvider>, region: impl Into<String>) -> Self {
        Self::new(credentials_provider, region, BEDROCK_RUNTIME_SERVICE)
    }

    /// Signer for S3.
    pub fn s3(credentials_provider: Arc<dyn CredentialsProvider>, region: impl Into<String>) -> Self {
        Self::new(credentials_provider, region, S3_SERVICE)
    }

    /// Sign with explicit credentials and timestamp.
    pub fn sign_with(
        &self,
        mut request: HttpRequest,
        credentials: &AwsCredentials,
        timestamp: &DateTime<Utc>,
    ) -> Result<HttpRequest, BedrockError> {
        let url = Url::parse(&request.url).map_err(|e| ConfigurationError::InvalidConfiguration {
            field: "url".to_string(),
            message: format!("Invalid URL '{}': {}", request.url, e),
        })?;

        let payload_hash = sha256_hex(request.body.as_deref().unwrap_or_default());

        request.headers.insert("host".to_string(), host_header(&url));
        request
            .headers
            .insert("x-amz-date".to_string(), format_datetime(timestamp));
        if self.service == S3_SERVICE {
            request
                .headers
                .insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        }
        if let Some(token) = credentials.session_token() {
            request
                .headers
                .insert("x-amz-security-token".to_string(), token.to_string());
        }

        let signing_headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-length"))
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();

        let canonical_path = if self.double_encode_path {
            uri_encode(url.path(), false)
        } else {
            url.path().to_string()
        };

        let authorization = sign_request(
            &request.method,
            &canonical_path,
            url.query().unwrap_or(""),
            &signing_headers,
            &payload_hash,
            credentials,
            &self.region,
            &self.service,
            timestamp,
        );
        request
            .headers
            .insert("authorization".to_string(), authorization);

        Ok(request)
    }
}

#[async_trait]
impl AwsSigner for SigV4Signer {
    async fn sign(&self, request: HttpRequest) -> Result<HttpRequest, BedrockError> {
        let credentials = self.credentials_provider.get_credentials().await?;
        self.sign_with(request, &credentials, &Utc::now())
    }

    fn service(&self) -> &str {
        &self.service
    }
}

impl std::fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigV4Signer")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Signing helpers
// ============================================================================

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Format datetime for AWS signature.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format date stamp for credential scope.
fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Calculate SHA-256 hash and return hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn build_signed_headers(headers: &[(String, String)]) -> String {
    let mut names: Vec<String> = headers.iter().map(|(n, _)| n.to_lowercase()).collect();
    names.sort();
    names.join(";")
}

fn build_canonical_headers(headers: &[(String, String)]) -> String {
    let mut sorted: Vec<(String, String)> = headers
        .iter()
        .map(|(n, v)| (n.to_lowercase(), v.split_whitespace().collect::<Vec<_>>().join(" ")))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    sorted
        .iter()
        .map(|(n, v)| format!("{}:{}\n", n, v))
        .collect()
}

/// URI encode per the SigV4 rules (unreserved characters kept).
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut result = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            b'/' if !encode_slash => result.push('/'),
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}

/// Canonical query string: decode what the URL carries, re-encode, sort.
fn build_canonical_query_string(query: &str) -> String {
    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                urlencoding::decode(&s.replace('+', " "))
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            };
            (uri_encode(&decode(key), true), uri_encode(&decode(value), true))
        })
        .collect();

    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn build_canonical_request(
    method: &str,
    canonical_path: &str,
    query: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let path = if canonical_path.is_empty() { "/" } else { canonical_path };

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        build_canonical_query_string(query),
        build_canonical_headers(headers),
        build_signed_headers(headers),
        payload_hash
    )
}

#[allow(clippy::too_many_arguments)]
fn sign_request(
    method: &str,
    canonical_path: &str,
    query: &str,
    headers: &[(String, String)],
    payload_hash: &str,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let date_stamp = format_date_stamp(timestamp);
    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, region, service);

    let canonical_request = build_canonical_request(method, canonical_path, query, headers, payload_hash);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        AWS_ALGORITHM,
        format_datetime(timestamp),
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(credentials.secret_access_key(), &date_stamp, region, service);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        AWS_ALGORITHM,
        credentials.access_key_id(),
        credential_scope,
        build_signed_headers(headers),
        signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialsProvider;
    use chrono::TimeZone;

    fn provider() -> Arc<dyn CredentialsProvider> {
        Arc::new(StaticCredentialsProvider::new(AwsCredentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        )))
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    #[test]
    fn test_aws_suite_get_vanilla() {
        let signer = SigV4Signer::new(provider(), "us-east-1", "service");
        let creds = AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signed = signer
            .sign_with(HttpRequest::new("GET", "https://example.amazonaws.com/"), &creds, &timestamp())
            .unwrap();

        assert_eq!(
            signed.get_header("authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
                 SignedHeaders=host;x-amz-date, \
                 Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
            )
        );
    }

    #[tokio::test]
    async fn test_sign_runtime_post() {
        let signer = SigV4Signer::runtime(provider(), "us-east-1");
        let request = HttpRequest::new(
            "POST",
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/invoke",
        )
        .with_header("content-type", "application/json")
        .with_body(r#"{"max_tokens":10}"#);

        let signed = signer.sign(request).await.unwrap();
        let auth = signed.get_header("authorization").unwrap();
        assert!(auth.contains("/us-east-1/bedrock-runtime/aws4_request"));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date"));
        assert!(signed.get_header("x-amz-content-sha256").is_none());
        assert_eq!(signer.service(), "bedrock-runtime");
    }

    #[test]
    fn test_s3_signs_content_hash_and_session_token() {
        let signer = SigV4Signer::s3(provider(), "us-west-2");
        let creds = AwsCredentials::new("AKID", "SECRET").with_session_token("TOKEN");
        let signed = signer
            .sign_with(
                HttpRequest::new("PUT", "https://my-bucket.s3.us-west-2.amazonaws.com/data/train.jsonl")
                    .with_header("content-length", "5")
                    .with_body("hello"),
                &creds,
                &timestamp(),
            )
            .unwrap();

        assert_eq!(
            signed.get_header("x-amz-content-sha256"),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert_eq!(signed.get_header("x-amz-security-token"), Some("TOKEN"));
        let auth = signed.get_header("authorization").unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn test_sign_rejects_invalid_url() {
        let signer = SigV4Signer::bedrock(provider(), "us-east-1");
        let creds = AwsCredentials::new("AKID", "SECRET");
        let result = signer.sign_with(HttpRequest::new("GET", "not a url"), &creds, &timestamp());
        assert!(matches!(result, Err(BedrockError::Configuration(_))));
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("hello", true), "hello");
        assert_eq!(uri_encode("hello world", true), "hello%20world");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
        assert_eq!(uri_encode("a/b", false), "a/b");
        assert_eq!(uri_encode("/model/a%3A0/invoke", false), "/model/a%253A0/invoke");
    }

    #[test]
    fn test_canonical_query_string_sorted_and_reencoded() {
        assert_eq!(
            build_canonical_query_string("statusEquals=InProgress&maxResults=10&nameContains=my%20job"),
            "maxResults=10&nameContains=my%20job&statusEquals=InProgress"
        );
        assert_eq!(build_canonical_query_string(""), "");
    }

    #[test]
    fn test_build_signed_headers() {
        let headers = vec![
            ("Host".to_string(), "example.com".to_string()),
            ("X-Amz-Date".to_string(), "20231215T120000Z".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        assert_eq!(build_signed_headers(&headers), "content-type;host;x-amz-date");
    }
}
