//! AWS Signature Version 4 request signing

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Errors from the signing primitives
#[derive(Debug, thiserror::Error)]
#[error("failed to sign request: {0}")]
pub struct SigningError(String);

/// The parts of a request that go into the signature
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Already-encoded path as it appears in the canonical request
    pub canonical_uri: &'a str,
    pub canonical_query: &'a str,
    /// Headers to sign; `host` must be present
    pub headers: Vec<(String, String)>,
    pub payload: &'a [u8],
}

/// Scope of the signature
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Sign `request`, returning the headers the caller must add
///
/// Always includes `x-amz-date` and `authorization`, plus
/// `x-amz-security-token` for temporary credentials.
pub fn sign(
    request: &SignableRequest<'_>,
    credentials: &AwsCredentials,
    scope: SigningScope<'_>,
) -> Result<Vec<(String, String)>, SigningError> {
    let amz_date = scope.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = scope.time.format("%Y%m%d").to_string();

    let mut extra = vec![("x-amz-date".to_string(), amz_date.clone())];
    if let Some(token) = credentials.session_token() {
        extra.push(("x-amz-security-token".to_string(), token.to_string()));
    }

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .chain(extra.iter())
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .collect();
    headers.sort();

    let canonical_headers: String = headers.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.canonical_uri,
        request.canonical_query,
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(request.payload)),
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date, scope.region, scope.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    );

    let key = signing_key(credentials.secret_access_key(), &date, scope.region, scope.service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id(), credential_scope, signed_headers, signature
    );

    extra.push(("authorization".to_string(), authorization));
    Ok(extra)
}

/// Derive the signing key for a date/region/service
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| SigningError(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encode a path segment using the SigV4 unreserved set
pub fn uri_encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
