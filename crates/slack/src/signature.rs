use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Requests older or newer than this are rejected to prevent replay.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

const SIGNATURE_PREFIX: &str = "v0=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request timestamp is not a unix timestamp")]
    MalformedTimestamp,
    #[error("request timestamp is outside the allowed window")]
    StaleTimestamp,
    #[error("signature header is malformed")]
    MalformedSignature,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies the `v0:{timestamp}:{body}` HMAC-SHA256 signature scheme.
///
/// `now` is injected so the replay window is testable without a clock stub.
pub fn verify_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    signature: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let request_ts: i64 =
        timestamp.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
    if (now.timestamp() - request_ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let provided = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::MalformedSignature)?;
    let provided = hex::decode(provided).map_err(|_| SignatureError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(signing_secret.expose_secret().as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);

    // verify_slice is constant-time.
    mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
}
