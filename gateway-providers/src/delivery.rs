//! Webhook delivery-id handling.

use sha2::{Digest, Sha256};

/// Returns the provider-supplied delivery id verbatim, or a stable hash
/// of the raw payload when the provider omits one.
///
/// Hashing the payload (rather than combining event type, resource id
/// and wall-clock time) keeps the id stable across provider retries of
/// the same delivery.
pub fn delivery_id(provider_id: Option<&str>, payload: &[u8]) -> String {
    match provider_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => synthesize(payload),
    }
}

fn synthesize(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    format!("evt_{}", hex::encode(&digest[..12]))
}
