//! Error taxonomy for COS calls

use std::time::Duration;
use thiserror::Error;

/// Failure reported by the transport collaborator.
///
/// Never retried internally; callers may retry these.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Structured error envelope returned by the storage service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("COS error {http_status_code} {error_code}: {message} (request id: {request_id})")]
pub struct ServiceError {
    pub http_status_code: u16,
    pub error_code: String,
    pub message: String,
    pub resource_url: String,
    pub request_id: String,
    pub trace_id: String,
}

/// COS client errors
#[derive(Error, Debug)]
pub enum CosError {
    #[error("signing configuration error: {0}")]
    SigningConfiguration(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CosError {
    /// The service error envelope, if this failure carries one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            CosError::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for CosError {
    fn from(err: quick_xml::Error) -> Self {
        CosError::MalformedResponse(format!("XML parse error: {}", err))
    }
}

impl From<hyper::http::Error> for CosError {
    fn from(err: hyper::http::Error) -> Self {
        CosError::InvalidRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CosError>;
