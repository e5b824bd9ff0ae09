//! Masking of displayable payment identifiers.
//!
//! Rules: never show more than the last 4 characters of a sensitive
//! value (last 8 for long random keys); for email-like identifiers show
//! the first 2 characters of the local part plus the full domain.

/// Keys at or above this length are treated as long random keys and get
/// 8 visible trailing characters instead of 4.
const LONG_KEY_THRESHOLD: usize = 20;

/// Masks a sensitive key, account number, or phone number.
pub fn mask_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let visible = if chars.len() >= LONG_KEY_THRESHOLD { 8 } else { 4 };
    if chars.len() <= visible {
        return "•".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - visible..].iter().collect();
    format!("{}{}", "•".repeat(4), tail)
}

/// Masks an email address: first 2 characters of the local part plus
/// the full domain. Values without an `@` fall back to key masking.
pub fn mask_email(value: &str) -> String {
    match value.split_once('@') {
        Some((local, domain)) => {
            let prefix: String = local.chars().take(2).collect();
            format!("{prefix}***@{domain}")
        }
        None => mask_key(value),
    }
}
