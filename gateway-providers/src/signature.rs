//! Webhook signature primitives shared by the adapters.
//!
//! Two schemes exist in the wild and both satisfy the same contract:
//! an HMAC-SHA256 hex digest of the raw body, and a static shared-token
//! equality check. Verification is constant-time relative to the secret
//! comparison, length-checked first, and never panics on
//! attacker-controlled input of any length.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signs a payload with HMAC-SHA256, hex-encoded lowercase.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies an HMAC-SHA256 hex signature.
pub fn verify_hmac(payload: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign_payload(payload, secret);
    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Verifies a static shared callback token.
pub fn verify_shared_token(supplied: &str, expected: &str) -> bool {
    if supplied.len() != expected.len() {
        return false;
    }
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_roundtrip() {
        let payload = br#"{"event":"cob.paid"}"#;
        let signature = sign_payload(payload, "secret-1");

        assert!(verify_hmac(payload, &signature, "secret-1"));
        assert!(!verify_hmac(payload, &signature, "secret-2"));
        assert!(!verify_hmac(b"tampered", &signature, "secret-1"));
    }

    #[test]
    fn test_single_byte_alteration_fails() {
        let payload = b"body";
        let mut signature = sign_payload(payload, "secret");
        let flipped = if signature.ends_with('0') { '1' } else { '0' };
        signature.pop();
        signature.push(flipped);
        assert!(!verify_hmac(payload, &signature, "secret"));
    }

    #[test]
    fn test_wrong_length_returns_false_without_panic() {
        assert!(!verify_hmac(b"body", "", "secret"));
        assert!(!verify_hmac(b"body", "abcd", "secret"));
        assert!(!verify_hmac(b"body", &"f".repeat(4096), "secret"));
    }

    #[test]
    fn test_shared_token() {
        assert!(verify_shared_token("cb-token", "cb-token"));
        assert!(!verify_shared_token("cb-tokex", "cb-token"));
        assert!(!verify_shared_token("short", "cb-token"));
        assert!(!verify_shared_token("", "cb-token"));
    }
}
