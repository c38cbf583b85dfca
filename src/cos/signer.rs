//! COS request signer (HMAC-SHA1, 30 second signing window)
//!
//! Signing steps:
//! 1. `sign_time = "{start};{start + 30}"`
//! 2. `sign_key = hex(HMAC-SHA1(secret_key, sign_time))`
//! 3. `string_to_sign = "sha1\n{sign_time}\n{hex(SHA1(canonical))}\n"`
//! 4. `signature = hex(HMAC-SHA1(sign_key, string_to_sign))`
//!
//! Nothing is cached: every call derives a fresh window from the clock.

use crate::cos::canonical::CanonicalRequest;
use crate::cos::error::{CosError, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::fmt;
use std::sync::Arc;

type HmacSha1 = Hmac<Sha1>;

/// Validity of a signature, fixed by the service protocol
pub const SIGNING_WINDOW_SECS: i64 = 30;

const ALGORITHM: &str = "sha1";

/// Secret key pair, immutable for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    secret_id: String,
    secret_key: String,
}

impl Credentials {
    /// Create credentials, rejecting empty values
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let secret_id = secret_id.into();
        let secret_key = secret_key.into();

        if secret_id.trim().is_empty() {
            return Err(CosError::SigningConfiguration("secret id is empty".to_string()));
        }
        if secret_key.trim().is_empty() {
            return Err(CosError::SigningConfiguration("secret key is empty".to_string()));
        }

        Ok(Self {
            secret_id,
            secret_key,
        })
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Source of "now" for signing
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds
    fn now_epoch_seconds(&self) -> i64;
}

/// Wall clock (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.0
    }
}

/// Interval in which the service accepts a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningWindow {
    pub start_epoch_seconds: i64,
    pub end_epoch_seconds: i64,
}

impl SigningWindow {
    pub fn starting_at(start_epoch_seconds: i64) -> Self {
        Self {
            start_epoch_seconds,
            end_epoch_seconds: start_epoch_seconds + SIGNING_WINDOW_SECS,
        }
    }
}

impl fmt::Display for SigningWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.start_epoch_seconds, self.end_epoch_seconds)
    }
}

/// Signed authorization fields, rendered in a fixed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationParameters {
    pub algorithm: String,
    pub access_key_id: String,
    pub sign_time: SigningWindow,
    pub key_time: SigningWindow,
    pub signed_header_list: String,
    pub signed_param_list: String,
    pub signature: String,
}

impl AuthorizationParameters {
    /// Render as the `Authorization` header value
    pub fn render(&self) -> String {
        format!(
            "q-sign-algorithm={}&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list={}&q-signature={}",
            self.algorithm,
            self.access_key_id,
            self.sign_time,
            self.key_time,
            self.signed_header_list,
            self.signed_param_list,
            self.signature
        )
    }
}

impl fmt::Display for AuthorizationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// COS request signer
///
/// Clone is cheap; credentials and clock are shared read-only.
#[derive(Clone)]
pub struct Signer {
    credentials: Arc<Credentials>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer reading the system clock
    pub fn new(credentials: Credentials) -> Self {
        Self::with_clock(credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            clock,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign with the window starting at the clock's current time and render
    /// the authorization string
    pub fn authorize(&self, request: &CanonicalRequest) -> Result<String> {
        let params = self.sign(request, self.clock.now_epoch_seconds())?;
        Ok(params.render())
    }

    /// Sign a canonical request with the window starting at `now`
    pub fn sign(&self, request: &CanonicalRequest, now: i64) -> Result<AuthorizationParameters> {
        let window = SigningWindow::starting_at(now);
        let sign_time = window.to_string();

        let sign_key = hex::encode(hmac_sha1(
            self.credentials.secret_key.as_bytes(),
            sign_time.as_bytes(),
        )?);

        let canonical = request.to_canonical_string();
        let string_to_sign = string_to_sign(&sign_time, &canonical);

        tracing::trace!(
            canonical_request = %canonical,
            string_to_sign = %string_to_sign,
            "signing request"
        );

        let signature = hex::encode(hmac_sha1(sign_key.as_bytes(), string_to_sign.as_bytes())?);

        Ok(AuthorizationParameters {
            algorithm: ALGORITHM.to_string(),
            access_key_id: self.credentials.secret_id.clone(),
            sign_time: window,
            key_time: window,
            signed_header_list: request.signed_header_list(),
            signed_param_list: request.signed_param_list(),
            signature,
        })
    }
}

fn string_to_sign(sign_time: &str, canonical: &str) -> String {
    let hashed = hex::encode(Sha1::digest(canonical.as_bytes()));
    format!("{}\n{}\n{}\n", ALGORITHM, sign_time, hashed)
}

fn hmac_sha1(key: &[u8], msg: &[u8]) -> Result<[u8; 20]> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| CosError::SigningConfiguration(format!("HMAC key rejected: {}", e)))?;
    mac.update(msg);
    let result = mac.finalize().into_bytes();
    let mut output = [0u8; 20];
    output.copy_from_slice(&result);
    Ok(output)
}
