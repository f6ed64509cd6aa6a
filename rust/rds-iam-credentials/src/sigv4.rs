//! AWS Signature Version 4 query-string presigning.
//!
//! Produces presigned URLs using [query string authentication]: the
//! signature and its parameters travel in the query string instead of an
//! `Authorization` header, so the resulting URL is self-contained. Only the
//! `host` header is signed and the payload is always empty.
//!
//! [query string authentication]: https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use thiserror::Error;

use crate::Credentials;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Longest validity a presigned URL may request: 7 days.
pub const MAX_EXPIRES: u64 = 604_800;

/// Errors that can occur during signing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// A request or signing parameter is unusable.
    #[error("invalid signing input: {0}")]
    InvalidInput(String),
    /// The requested validity exceeds what SigV4 allows.
    #[error("expiration of {0} seconds exceeds the {MAX_EXPIRES} second limit")]
    ExpiresTooLong(u64),
}

/// The request to presign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignRequest {
    /// HTTP method (e.g. `GET`)
    pub method: &'static str,
    /// Value of the `host` header, including a port if one is addressed
    pub host: String,
    /// Absolute request path
    pub path: String,
    /// Request-specific query parameters, unencoded
    pub params: Vec<(String, String)>,
}

/// Parameters that scope a signature.
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    /// Credentials the signing key is derived from
    pub credentials: &'a Credentials,
    /// Signing region
    pub region: &'a str,
    /// Signing service name
    pub service: &'a str,
    /// Signature timestamp
    pub time: DateTime<Utc>,
    /// Validity of the presigned URL in seconds
    pub expires: u64,
}

/// Presign `request`, returning the full `https://` URL.
pub fn presign(
    request: &PresignRequest,
    params: &SigningParams<'_>,
) -> Result<String, SigningError> {
    if request.host.is_empty() {
        return Err(SigningError::InvalidInput("host is empty".into()));
    }
    if !request.path.starts_with('/') {
        return Err(SigningError::InvalidInput(format!(
            "path `{}` is not absolute",
            request.path
        )));
    }
    if params.region.is_empty() {
        return Err(SigningError::InvalidInput("region is empty".into()));
    }
    if params.expires == 0 {
        return Err(SigningError::InvalidInput("expiration is zero".into()));
    }
    if params.expires > MAX_EXPIRES {
        return Err(SigningError::ExpiresTooLong(params.expires));
    }

    let timestamp = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = &timestamp[0..8];

    // Derive signing key on demand
    let key = SigningKey::derive(
        params.credentials.secret_access_key(),
        date,
        params.region,
        params.service,
    );
    let scope = format!("{}/{}/{}/aws4_request", date, params.region, params.service);

    let mut query_params = request.params.clone();
    query_params.extend([
        ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
        (
            "X-Amz-Credential".to_string(),
            format!("{}/{}", params.credentials.access_key_id(), scope),
        ),
        ("X-Amz-Date".to_string(), timestamp.clone()),
        ("X-Amz-Expires".to_string(), params.expires.to_string()),
        ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
    ]);
    if let Some(token) = params.credentials.session_token() {
        query_params.push(("X-Amz-Security-Token".to_string(), token.to_string()));
    }

    // Sort all query parameters alphabetically (required by SigV4)
    query_params.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_query: String = query_params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{}\nhost:{}\n\nhost\n{}",
        request.method,
        percent_encode_path(&request.path),
        canonical_query,
        request.host.trim(),
        hex_encode(&Sha256::digest(b""))
    );

    // Create string to sign
    let digest = Sha256::digest(canonical_request.as_bytes());
    let payload = format!("{}\n{}\n{}\n{}", ALGORITHM, timestamp, scope, hex_encode(&digest));

    let signature = key.sign(payload.as_bytes());

    Ok(format!(
        "https://{}{}?{}&X-Amz-Signature={}",
        request.host,
        percent_encode_path(&request.path),
        canonical_query,
        signature
    ))
}

/// AWS SigV4 signing key.
struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    /// Derive a signing key for the given date, region, and service.
    fn derive(secret_key: &str, date: &str, region: &str, service: &str) -> Self {
        let date_key = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
        let region_key = hmac_sha256(&date_key, region.as_bytes());
        let service_key = hmac_sha256(&region_key, service.as_bytes());
        let signing_key = hmac_sha256(&service_key, b"aws4_request");

        Self(Hmac::new_from_slice(&signing_key).expect("HMAC can take key of any size"))
    }

    /// Sign a message with this key.
    fn sign(&self, message: &[u8]) -> Signature {
        let mut mac = self.0.clone();
        mac.update(message);
        Signature(mac.finalize().into_bytes().to_vec())
    }
}

/// HMAC-SHA256 signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature(Vec<u8>);

impl std::fmt::Display for Signature {
    /// Displays hex encoded representation of the signature
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

/// Compute HMAC-SHA256.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Hex-encode bytes.
fn hex_encode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(result, "{:02x}", byte).unwrap();
    }
    result
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                write!(result, "%{:02X}", byte).unwrap();
            }
        }
    }
    result
}

/// Percent-encode a URL path (preserving slashes).
fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/")
}
