//! Secret comparison helpers.
//!
//! Everything here goes through the `subtle` crate so that comparing a
//! caller-supplied value against a configured secret takes the same time
//! whether the first byte or the last byte differs.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time byte comparison that does not leak input lengths or content.
///
/// Both inputs are hashed to SHA-256 digests first, so timing reveals neither
/// the content nor the length of either side.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

/// Exact-match check of a supplied header value against the configured secret.
///
/// An absent header never matches, even when the configured secret is empty.
pub fn secret_matches(expected: &str, supplied: Option<&str>) -> bool {
    match supplied {
        Some(value) => constant_time_eq(expected.as_bytes(), value.as_bytes()),
        None => false,
    }
}
