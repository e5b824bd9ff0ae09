//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use gateway_types::{
    Account, AccountId, AccountKind, AccountStatus, ApiToken, ApiTokenId, Currency, LedgerError,
    Money,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub user_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub user_id: String,

    pub kind: String,
    pub status: String,
    pub balance: i64,
    pub available_balance: i64,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub metadata: serde_json::Value,
    #[cfg(feature = "sqlite")]
    pub metadata: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub updated_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub updated_at: String,

    pub version: i64,
}

/// API token row from database.
#[derive(FromRow)]
pub struct DbApiToken {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub user_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub user_id: String,

    pub token_prefix: String,
    pub token_hash: Vec<u8>,
    pub name: String,

    #[cfg(not(feature = "sqlite"))]
    pub scopes: Vec<String>,
    #[cfg(feature = "sqlite")]
    pub scopes: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub expires_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub expires_at: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub last_used_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_used_at: Option<String>,

    pub last_used_ip: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub revoked_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub revoked_at: Option<String>,

    pub revoked_reason: Option<String>,
    pub version: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, LedgerError> {
    s.parse()
        .map_err(|_| LedgerError::Database(format!("Unknown currency: {}", s)))
}

pub fn parse_kind(s: &str) -> Result<AccountKind, LedgerError> {
    match s {
        "WALLET" => Ok(AccountKind::Wallet),
        "SETTLEMENT" => Ok(AccountKind::Settlement),
        _ => Err(LedgerError::Database(format!("Unknown account kind: {}", s))),
    }
}

pub fn parse_status(s: &str) -> Result<AccountStatus, LedgerError> {
    match s {
        "ACTIVE" => Ok(AccountStatus::Active),
        "FROZEN" => Ok(AccountStatus::Frozen),
        "CLOSED" => Ok(AccountStatus::Closed),
        _ => Err(LedgerError::Database(format!("Unknown account status: {}", s))),
    }
}

#[cfg(feature = "sqlite")]
fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, LedgerError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| LedgerError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
fn parse_uuid(s: &str) -> Result<uuid::Uuid, LedgerError> {
    uuid::Uuid::parse_str(s).map_err(|e| LedgerError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, LedgerError> {
        let currency = parse_currency(&self.currency)?;
        let balance = Money::new(self.balance, currency)?;
        let available_balance = Money::new(self.available_balance, currency)?;
        let kind = parse_kind(&self.kind)?;
        let status = parse_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, user_id, metadata, created_at, updated_at) = (
            AccountId::from_uuid(self.id),
            self.user_id,
            self.metadata,
            self.created_at,
            self.updated_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, user_id, metadata, created_at, updated_at) = {
            let metadata: serde_json::Value = serde_json::from_str(&self.metadata)
                .map_err(|e| LedgerError::Database(e.to_string()))?;
            (
                AccountId::from_uuid(parse_uuid(&self.id)?),
                parse_uuid(&self.user_id)?,
                metadata,
                parse_datetime(&self.created_at)?,
                parse_datetime(&self.updated_at)?,
            )
        };

        Ok(Account {
            id,
            user_id,
            kind,
            status,
            balance,
            available_balance,
            metadata,
            created_at,
            updated_at,
            version: self.version,
        })
    }
}

impl DbApiToken {
    /// Convert database row to domain ApiToken.
    pub fn into_domain(self) -> Result<ApiToken, LedgerError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, user_id, scopes, created_at, expires_at, last_used_at, revoked_at) = (
            ApiTokenId::from_uuid(self.id),
            self.user_id,
            self.scopes,
            self.created_at,
            self.expires_at,
            self.last_used_at,
            self.revoked_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, user_id, scopes, created_at, expires_at, last_used_at, revoked_at) = {
            let scopes: Vec<String> = serde_json::from_str(&self.scopes)
                .map_err(|e| LedgerError::Database(e.to_string()))?;
            (
                ApiTokenId::from_uuid(parse_uuid(&self.id)?),
                parse_uuid(&self.user_id)?,
                scopes,
                parse_datetime(&self.created_at)?,
                self.expires_at.as_deref().map(parse_datetime).transpose()?,
                self.last_used_at.as_deref().map(parse_datetime).transpose()?,
                self.revoked_at.as_deref().map(parse_datetime).transpose()?,
            )
        };

        Ok(ApiToken {
            id,
            user_id,
            // CHAR(8) columns come back space-padded.
            prefix: self.token_prefix.trim_end().to_string(),
            hash: self.token_hash,
            name: self.name,
            scopes,
            created_at,
            expires_at,
            last_used_at,
            last_used_ip: self.last_used_ip,
            revoked_at,
            revoked_reason: self.revoked_reason,
            version: self.version,
        })
    }
}
