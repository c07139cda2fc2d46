//! Verification of signed payment-provider webhooks.
//!
//! The provider sends a header of the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`.
//! Each `v1` value is an HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! endpoint's signing secret. Several `v1` entries appear while a secret is
//! being rolled; any one of them matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::constants::SIGNATURE_TOLERANCE_SECS;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signature header value was provided")]
    Missing,

    #[error("Unable to extract timestamp and signatures from header")]
    Malformed,

    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    #[error("Timestamp outside the tolerance zone ({0})")]
    Expired(i64),
}

/// Parsed `t=...,v1=...` signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value.to_string()),
                // v0 and future schemes are ignored
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(SignatureError::Malformed),
        }
    }
}

fn keyed_mac(secret: &[u8], timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Compute the hex `v1` signature for `payload` signed at `timestamp`.
pub fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    hex::encode(keyed_mac(secret, timestamp, payload).finalize().into_bytes())
}

/// Build a complete header value, as the provider would send it.
pub fn signature_header(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)
    )
}

/// Verify `payload` against a signature header value at time `now`.
///
/// Comparison of each candidate is constant-time (`verify_slice`).
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let parsed = SignatureHeader::parse(header)?;

    let expected = keyed_mac(secret, parsed.timestamp, payload);
    let matched = parsed.signatures.iter().any(|candidate| {
        // Undecodable hex compares against zeros so every candidate costs the same
        let bytes = hex::decode(candidate).unwrap_or_else(|_| vec![0u8; 32]);
        expected.clone().verify_slice(&bytes).is_ok()
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    // Only age is bounded; a sender clock running ahead is tolerated
    if now - parsed.timestamp > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired(parsed.timestamp));
    }

    Ok(())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_signed_payload_verifies() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = signature_header(SECRET, NOW, body);
        assert_eq!(verify_signature(body, Some(&header), SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = signature_header(SECRET, NOW, b"original");
        assert_eq!(
            verify_signature(b"tampered", Some(&header), SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = signature_header(b"other", NOW, b"body");
        assert_eq!(
            verify_signature(b"body", Some(&header), SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = compute_signature(SECRET, NOW, b"body");
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");
        assert!(verify_signature(b"body", Some(&header), SECRET, NOW).is_ok());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let signed_at = NOW - SIGNATURE_TOLERANCE_SECS - 1;
        let header = signature_header(SECRET, signed_at, b"body");
        assert_eq!(
            verify_signature(b"body", Some(&header), SECRET, NOW),
            Err(SignatureError::Expired(signed_at))
        );
    }

    #[test]
    fn test_future_timestamp_accepted() {
        let signed_at = NOW + SIGNATURE_TOLERANCE_SECS + 60;
        let header = signature_header(SECRET, signed_at, b"body");
        assert_eq!(verify_signature(b"body", Some(&header), SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        assert_eq!(
            verify_signature(b"body", None, SECRET, NOW),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            SignatureHeader::parse("v1=abcd"),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            SignatureHeader::parse("t=notanumber,v1=abcd"),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            SignatureHeader::parse(&format!("t={NOW}")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_invalid_hex_candidate_does_not_match() {
        let header = format!("t={NOW},v1=not-hex-zz");
        assert_eq!(
            verify_signature(b"body", Some(&header), SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
    }
}
