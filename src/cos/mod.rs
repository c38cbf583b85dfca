//! COS client module with request signing
//!
//! This module provides:
//! - Request canonicalization and HMAC-SHA1 signing with a 30 second window
//! - Decoding of XML success and error envelopes into typed outcomes
//! - An injectable transport and async bucket/object operations

pub mod canonical;
pub mod client;
pub mod error;
pub mod response;
pub mod signer;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use canonical::CanonicalRequest;
pub use client::{CosClient, CosConfig};
pub use error::{CosError, Result, ServiceError, TransportError};
pub use signer::{
    AuthorizationParameters, Clock, Credentials, FixedClock, Signer, SigningWindow, SystemClock,
};
pub use transport::{HyperTransport, Transport};
pub use types::{BucketInfo, ListBucketsResponse, PutObjectOutput};
