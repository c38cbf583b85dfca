//! COS client: bucket and object operations
//!
//! Every call follows the same path:
//! - build the request with its `Host` header
//! - canonicalize the request exactly as it will be sent
//! - sign and attach `Authorization`
//! - hand it to the transport and decode the envelope
//!
//! Nothing is retried; retry policy belongs to the caller.

use crate::cos::canonical::CanonicalRequest;
use crate::cos::error::{CosError, Result};
use crate::cos::response::{decode_list_buckets, ensure_success};
use crate::cos::signer::{Clock, Credentials, Signer};
use crate::cos::transport::{HyperTransport, Transport};
use crate::cos::types::{ListBucketsResponse, PutObjectOutput};
use bytes::Bytes;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, ETAG, HOST};
use hyper::{Method, Request, Response, StatusCode};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Hex lookup table for URI encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

const DEFAULT_DOMAIN: &str = "myqcloud.com";

/// Settings needed to build a [`CosClient`]
#[derive(Debug, Clone)]
pub struct CosConfig {
    pub secret_id: String,
    pub secret_key: String,
    /// Application id appended to bucket names (`{bucket}-{app_id}`)
    pub app_id: String,
    pub region: String,
    /// `https` or `http`
    pub scheme: String,
    /// Domain suffix for service and bucket hosts
    pub domain: String,
    /// Per-request timeout for the default transport
    pub timeout: Duration,
}

impl CosConfig {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        app_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            app_id: app_id.into(),
            region: region.into(),
            scheme: "https".to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// COS client
///
/// Clone is cheap - the signer and transport are shared behind `Arc`.
#[derive(Clone)]
pub struct CosClient {
    transport: Arc<dyn Transport>,
    signer: Signer,
    app_id: String,
    region: String,
    scheme: String,
    domain: String,
}

impl CosClient {
    /// Create a client using the default hyper transport
    pub fn new(config: CosConfig) -> Result<Self> {
        let transport = HyperTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client sending through the given transport
    pub fn with_transport(config: CosConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = Credentials::new(config.secret_id, config.secret_key)?;
        if config.app_id.trim().is_empty() {
            return Err(CosError::SigningConfiguration("app id is empty".to_string()));
        }

        Ok(Self {
            transport,
            signer: Signer::new(credentials),
            app_id: config.app_id,
            region: config.region,
            scheme: config.scheme,
            domain: config.domain,
        })
    }

    /// Replace the time source used for signing windows
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.signer = Signer::with_clock(self.signer.credentials().clone(), clock);
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// List all buckets owned by the account (GET Service)
    pub async fn list_buckets(&self) -> Result<ListBucketsResponse> {
        let host = self.service_host();
        let response = self.execute(Method::GET, &host, "/", &[], Bytes::new()).await?;
        let (status, body) = split_response(response);
        let body = ensure_success(status, body, &[StatusCode::OK])?;
        decode_list_buckets(&body)
    }

    /// Create a bucket in the client's region
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let host = self.bucket_host(bucket)?;
        let response = self.execute(Method::PUT, &host, "/", &[], Bytes::new()).await?;
        let (status, body) = split_response(response);
        ensure_success(status, body, &[StatusCode::OK])?;
        Ok(())
    }

    /// Delete an empty bucket
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let host = self.bucket_host(bucket)?;
        let response = self.execute(Method::DELETE, &host, "/", &[], Bytes::new()).await?;
        let (status, body) = split_response(response);
        ensure_success(status, body, &[StatusCode::OK, StatusCode::NO_CONTENT])?;
        Ok(())
    }

    /// Upload an object, returning its ETag
    pub async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<PutObjectOutput> {
        let host = self.bucket_host(bucket)?;
        let path = object_path(key)?;
        let length = data.len().to_string();

        let response = self
            .execute(Method::PUT, &host, &path, &[(CONTENT_LENGTH, length.as_str())], data)
            .await?;

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string());
        let (status, body) = split_response(response);
        ensure_success(status, body, &[StatusCode::OK])?;

        Ok(PutObjectOutput { etag })
    }

    /// Download an object
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let host = self.bucket_host(bucket)?;
        let path = object_path(key)?;
        let response = self.execute(Method::GET, &host, &path, &[], Bytes::new()).await?;
        let (status, body) = split_response(response);
        ensure_success(status, body, &[StatusCode::OK])
    }

    /// Delete an object
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let host = self.bucket_host(bucket)?;
        let path = object_path(key)?;
        let response = self.execute(Method::DELETE, &host, &path, &[], Bytes::new()).await?;
        let (status, body) = split_response(response);
        ensure_success(status, body, &[StatusCode::OK, StatusCode::NO_CONTENT])?;
        Ok(())
    }

    /// Build, sign and send one request.
    ///
    /// The canonical form is taken from the finished request so signing and
    /// transmission can never diverge.
    async fn execute(
        &self,
        method: Method,
        host: &str,
        path: &str,
        headers: &[(hyper::header::HeaderName, &str)],
        body: Bytes,
    ) -> Result<Response<Bytes>> {
        let url = format!("{}://{}{}", self.scheme, host, path);

        let mut builder = Request::builder().method(method).uri(&url).header(HOST, host);
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let mut request = builder.body(body)?;

        let canonical = CanonicalRequest::from_request(&request)?;
        let authorization = self.signer.authorize(&canonical)?;
        let value = HeaderValue::from_str(&authorization)
            .map_err(|e| CosError::InvalidRequest(format!("authorization header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, value);

        tracing::debug!(method = %request.method(), host, path, "sending COS request");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = %response.status(), host, path, "received COS response");

        Ok(response)
    }

    fn service_host(&self) -> String {
        format!("service.cos.{}", self.domain)
    }

    /// `{bucket}-{app_id}.cos.{region}.{domain}`
    fn bucket_host(&self, bucket: &str) -> Result<String> {
        if bucket.is_empty() {
            return Err(CosError::InvalidRequest("bucket name is empty".to_string()));
        }
        let valid = bucket
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-'));
        if !valid || bucket.starts_with('-') || bucket.ends_with('-') {
            return Err(CosError::InvalidRequest(format!(
                "bucket name {:?} may only contain lowercase letters, digits and inner hyphens",
                bucket
            )));
        }

        Ok(format!(
            "{}-{}.cos.{}.{}",
            bucket, self.app_id, self.region, self.domain
        ))
    }
}

fn split_response(response: Response<Bytes>) -> (StatusCode, Bytes) {
    let status = response.status();
    (status, response.into_body())
}

fn object_path(key: &str) -> Result<String> {
    let key = key.trim_start_matches('/');
    if key.is_empty() {
        return Err(CosError::InvalidRequest("object key is empty".to_string()));
    }
    Ok(format!("/{}", encode_key(key)))
}

/// Encode an object key, preserving forward slashes
/// Returns Cow::Borrowed when no encoding is needed
fn encode_key(key: &str) -> Cow<'_, str> {
    let needs_encoding = key
        .bytes()
        .any(|b| !matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/'));

    if !needs_encoding {
        return Cow::Borrowed(key);
    }

    let mut result = String::with_capacity(key.len() + 32);
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                result.push(byte as char);
            }
            _ => {
                result.push('%');
                result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
            }
        }
    }
    Cow::Owned(result)
}
