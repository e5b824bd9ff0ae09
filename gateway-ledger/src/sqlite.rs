//! SQLite ledger adapter.
//!
//! Same semantics as the PostgreSQL adapter with TEXT storage for ids,
//! timestamps and JSON. SQLite serializes writers per transaction, so
//! there is no `FOR UPDATE`; rows are still read in ascending id order
//! inside the transaction to keep the access pattern identical.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use gateway_types::{
    Account, AccountId, AccountKind, ApiToken, ApiTokenId, DomainError, LedgerError,
    LedgerRepository, Money, NewAccount, NewApiToken,
};

use crate::security::{generate_token_secret, hash_api_token, token_prefix};
use crate::types::{DbAccount, DbApiToken};

const ACCOUNT_COLUMNS: &str =
    "id, user_id, kind, status, balance, available_balance, currency, metadata, created_at, updated_at, version";
const TOKEN_COLUMNS: &str =
    "id, user_id, token_prefix, token_hash, name, scopes, created_at, expires_at, last_used_at, last_used_ip, revoked_at, revoked_reason, version";

/// SQLite ledger implementation.
pub struct SqliteLedger {
    pool: SqlitePool,
}

/// Version-checked account write. Returns the number of rows matched.
async fn apply_account_update<'e, E>(
    executor: E,
    account: &Account,
    now: DateTime<Utc>,
) -> Result<u64, LedgerError>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let metadata = serde_json::to_string(&account.metadata)
        .map_err(|e| LedgerError::Database(e.to_string()))?;
    let result = sqlx::query(
        r#"UPDATE accounts
           SET status = ?, balance = ?, available_balance = ?, metadata = ?,
               updated_at = ?, version = version + 1
           WHERE id = ? AND version = ?"#,
    )
    .bind(account.status.as_ref())
    .bind(account.balance.amount())
    .bind(account.available_balance.amount())
    .bind(metadata)
    .bind(now.to_rfc3339())
    .bind(account.id.to_string())
    .bind(account.version)
    .execute(executor)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;
    Ok(result.rows_affected())
}

impl SqliteLedger {
    /// Creates a new SQLite ledger with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            // In-memory databases are per-connection; more than one
            // connection would hand callers an empty database.
            pool_options = pool_options.max_connections(1);
        }
        let pool = pool_options.connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_accounts_sqlite.sql");
        sqlx::query(ddl).execute(&pool).await?;

        let ddl_tokens = include_str!("../migrations/0002_create_api_tokens_sqlite.sql");
        sqlx::query(ddl_tokens).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction for callers composing multiple ledger writes.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>, LedgerError> {
        self.pool
            .begin()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))
    }

    /// Reads the given accounts inside `tx` in ascending id order.
    pub async fn accounts_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        ids: &[AccountId],
    ) -> Result<Vec<Account>, LedgerError> {
        let mut sorted: Vec<AccountId> = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut accounts = Vec::with_capacity(sorted.len());
        for id in sorted {
            let row: Option<DbAccount> = sqlx::query_as(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
            ))
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

            let row = row.ok_or(LedgerError::NotFound)?;
            accounts.push(row.into_domain()?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerRepository for SqliteLedger {
    async fn create_account(&self, req: NewAccount) -> Result<Account, LedgerError> {
        let mut account = Account::new(req.user_id, req.kind, req.currency);
        account.metadata = req.metadata;

        let metadata = serde_json::to_string(&account.metadata)
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO accounts (id, user_id, kind, status, balance, available_balance, currency, metadata, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, 0, 0, ?, ?, ?, ?, 1)"#,
        )
        .bind(account.id.to_string())
        .bind(account.user_id.to_string())
        .bind(account.kind.as_ref())
        .bind(account.status.as_ref())
        .bind(account.currency().to_string())
        .bind(&metadata)
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                LedgerError::Conflict(format!(
                    "Account already exists for user {} kind {}",
                    account.user_id, account.kind
                ))
            }
            _ => LedgerError::Database(e.to_string()),
        })?;

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let row: Option<DbAccount> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LedgerError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn find_account_for_user(
        &self,
        user_id: Uuid,
        kind: AccountKind,
    ) -> Result<Option<Account>, LedgerError> {
        let row: Option<DbAccount> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ? AND kind = ?"
        ))
        .bind(user_id.to_string())
        .bind(kind.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn list_accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, LedgerError> {
        let rows: Vec<DbAccount> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ? ORDER BY created_at"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(DbAccount::into_domain).collect()
    }

    async fn update_account(&self, account: &Account) -> Result<Account, LedgerError> {
        let now = Utc::now();
        let matched = apply_account_update(&self.pool, account, now).await?;

        if matched == 0 {
            return match self.get_account(account.id).await? {
                Some(_) => Err(LedgerError::optimistic_lock("account", account.id)),
                None => Err(LedgerError::NotFound),
            };
        }

        let mut updated = account.clone();
        updated.updated_at = now;
        updated.version += 1;
        Ok(updated)
    }

    async fn transfer_balance(
        &self,
        debit_id: AccountId,
        credit_id: AccountId,
        amount: Money,
    ) -> Result<(Account, Account), LedgerError> {
        if debit_id == credit_id {
            return Err(LedgerError::Domain(DomainError::Validation(
                "Cannot transfer within the same account".into(),
            )));
        }

        let mut tx = self.begin().await?;
        let locked = self.accounts_for_update(&mut tx, &[debit_id, credit_id]).await?;

        let mut debit = locked
            .iter()
            .find(|a| a.id == debit_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;
        let mut credit = locked
            .iter()
            .find(|a| a.id == credit_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;

        debit.debit(amount)?;
        credit.credit(amount)?;

        let now = Utc::now();
        for account in [&debit, &credit] {
            let matched = apply_account_update(&mut *tx, account, now).await?;
            if matched == 0 {
                return Err(LedgerError::optimistic_lock("account", account.id));
            }
        }

        tx.commit()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?;

        debit.updated_at = now;
        debit.version += 1;
        credit.updated_at = now;
        credit.version += 1;
        Ok((debit, credit))
    }

    async fn create_api_token(
        &self,
        req: NewApiToken,
    ) -> Result<(ApiToken, String), LedgerError> {
        let secret = generate_token_secret();
        let token = ApiToken {
            id: ApiTokenId::new(),
            user_id: req.user_id,
            prefix: token_prefix(&secret),
            hash: hash_api_token(&secret),
            name: req.name,
            scopes: req.scopes,
            created_at: Utc::now(),
            expires_at: req.expires_at,
            last_used_at: None,
            last_used_ip: None,
            revoked_at: None,
            revoked_reason: None,
            version: 1,
        };

        let scopes = serde_json::to_string(&token.scopes)
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO api_tokens (id, user_id, token_prefix, token_hash, name, scopes, created_at, expires_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(token.id.to_string())
        .bind(token.user_id.to_string())
        .bind(&token.prefix)
        .bind(&token.hash)
        .bind(&token.name)
        .bind(&scopes)
        .bind(token.created_at.to_rfc3339())
        .bind(token.expires_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok((token, secret))
    }

    async fn find_token_by_hash(&self, hash: &[u8]) -> Result<Option<ApiToken>, LedgerError> {
        let row: Option<DbApiToken> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE token_hash = ? AND revoked_at IS NULL"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        row.map(DbApiToken::into_domain).transpose()
    }

    async fn touch_token(&self, id: ApiTokenId, ip: Option<&str>) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"UPDATE api_tokens SET last_used_at = ?, last_used_ip = ? WHERE id = ?"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(ip)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    async fn revoke_token(&self, id: ApiTokenId, reason: &str) -> Result<ApiToken, LedgerError> {
        let result = sqlx::query(
            r#"UPDATE api_tokens
               SET revoked_at = ?, revoked_reason = ?, version = version + 1
               WHERE id = ? AND revoked_at IS NULL"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(reason)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        let row: Option<DbApiToken> =
            sqlx::query_as(&format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LedgerError::Database(e.to_string()))?;

        let token = row.ok_or(LedgerError::NotFound)?.into_domain()?;
        if result.rows_affected() == 0 {
            // Row exists but the update matched nothing: already revoked.
            return Err(LedgerError::Conflict(format!("Token already revoked: {id}")));
        }
        Ok(token)
    }

    async fn list_tokens_for_user(&self, user_id: Uuid) -> Result<Vec<ApiToken>, LedgerError> {
        let rows: Vec<DbApiToken> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(DbApiToken::into_domain).collect()
    }
}
