//! Request canonicalization for COS signing
//!
//! The canonical form is a four-line block:
//!
//! ```text
//! {method}\n{path}\n{query}\n{headers}\n
//! ```
//!
//! Query and header pairs are lower-cased and sorted by key so the result does
//! not depend on the order or casing the caller used. Header values are
//! percent-encoded before lower-casing. No time-dependent material is included.

use crate::cos::error::{CosError, Result};
use hyper::Request;

/// Deterministic representation of a request, used as signing input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl CanonicalRequest {
    /// Canonicalize raw request components.
    ///
    /// `query` is the raw query string without the leading `?`. A parameter
    /// without `=` gets an empty value; empty segments are skipped.
    pub fn new<I, K, V>(method: &str, path: &str, query: &str, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query_pairs: Vec<(String, String)> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_lowercase(), v.to_lowercase()),
                None => (pair.to_lowercase(), String::new()),
            })
            .collect();
        // Stable: equal keys keep encounter order
        query_pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut header_pairs: Vec<(String, String)> = headers
            .into_iter()
            .map(|(k, v)| {
                (
                    k.as_ref().to_lowercase(),
                    urlencoding::encode(v.as_ref()).to_lowercase(),
                )
            })
            .collect();
        header_pairs.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            method: method.to_lowercase(),
            path: path.to_string(),
            query: query_pairs,
            headers: header_pairs,
        }
    }

    /// Canonicalize a fully built request, exactly as it will be sent.
    ///
    /// Header values must be visible ASCII; anything else cannot be signed.
    pub fn from_request<B>(req: &Request<B>) -> Result<Self> {
        let mut headers = Vec::with_capacity(req.headers().len());
        for (name, value) in req.headers() {
            let value = value.to_str().map_err(|_| {
                CosError::InvalidRequest(format!("header {} is not valid ASCII", name))
            })?;
            headers.push((name.as_str(), value));
        }

        let uri = req.uri();
        Ok(Self::new(
            req.method().as_str(),
            uri.path(),
            uri.query().unwrap_or(""),
            headers,
        ))
    }

    /// Lower-cased HTTP method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path, unmodified
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sorted `(key, value)` query pairs
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Sorted `(name, escaped value)` header pairs
    pub fn header_pairs(&self) -> &[(String, String)] {
        &self.headers
    }

    /// `;`-joined sorted header names
    pub fn signed_header_list(&self) -> String {
        join_keys(&self.headers)
    }

    /// `;`-joined sorted query parameter names
    pub fn signed_param_list(&self) -> String {
        join_keys(&self.query)
    }

    /// Render the canonical string that gets hashed by the signer
    pub fn to_canonical_string(&self) -> String {
        let query = join_pairs(&self.query);
        let headers = join_pairs(&self.headers);

        let mut result = String::with_capacity(
            self.method.len() + self.path.len() + query.len() + headers.len() + 4,
        );
        result.push_str(&self.method);
        result.push('\n');
        result.push_str(&self.path);
        result.push('\n');
        result.push_str(&query);
        result.push('\n');
        result.push_str(&headers);
        result.push('\n');
        result
    }
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    let mut result = String::with_capacity(pairs.len() * 32);
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            result.push('&');
        }
        result.push_str(k);
        result.push('=');
        result.push_str(v);
    }
    result
}

fn join_keys(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}
