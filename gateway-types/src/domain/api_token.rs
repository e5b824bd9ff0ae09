//! API token domain type.
//!
//! Tokens are looked up by a SHA-256 hash of the secret, never by the
//! raw value. Revocation is a column update so the audit trail survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiTokenId(Uuid);

impl ApiTokenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ApiTokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiTokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ApiTokenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A stored API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: ApiTokenId,
    pub user_id: Uuid,
    /// First 8 characters of the secret, shown in UIs so users can tell
    /// tokens apart without the secret itself.
    pub prefix: String,
    /// SHA-256 digest of the full secret.
    #[serde(skip_serializing)]
    pub hash: Vec<u8>,
    pub name: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_ip: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    /// Optimistic-concurrency counter.
    pub version: i64,
}

impl ApiToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= at)
    }

    /// A token is usable when it is neither revoked nor expired.
    pub fn is_usable(&self, at: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(at)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token() -> ApiToken {
        ApiToken {
            id: ApiTokenId::new(),
            user_id: Uuid::new_v4(),
            prefix: "gwt_ab12".to_string(),
            hash: vec![0u8; 32],
            name: "ci".to_string(),
            scopes: vec!["payments:read".to_string()],
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
            last_used_ip: None,
            revoked_at: None,
            revoked_reason: None,
            version: 1,
        }
    }

    #[test]
    fn test_usable_token() {
        let token = token();
        assert!(token.is_usable(Utc::now()));
        assert!(token.has_scope("payments:read"));
        assert!(!token.has_scope("payments:write"));
    }

    #[test]
    fn test_expired_token() {
        let mut token = token();
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired(Utc::now()));
        assert!(!token.is_usable(Utc::now()));
    }

    #[test]
    fn test_revoked_token() {
        let mut token = token();
        token.revoked_at = Some(Utc::now());
        token.revoked_reason = Some("rotated".to_string());
        assert!(token.is_revoked());
        assert!(!token.is_usable(Utc::now()));
    }
}
