//! PostgreSQL ledger adapter.
//!
//! Concurrency discipline: multi-row operations lock rows with
//! `SELECT ... FOR UPDATE` issued in ascending id order, so overlapping
//! transfers cannot deadlock on lock ordering; every write carries a
//! `version` check and bumps the counter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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

/// PostgreSQL ledger with row-level locking.
pub struct PgLedger {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_accounts_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_api_tokens_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

/// Version-checked account write. Returns the number of rows matched;
/// zero means a concurrent writer won or the row is gone.
async fn apply_account_update<'e, E>(
    executor: E,
    account: &Account,
    now: DateTime<Utc>,
) -> Result<u64, LedgerError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"UPDATE accounts
           SET status = $1, balance = $2, available_balance = $3, metadata = $4,
               updated_at = $5, version = version + 1
           WHERE id = $6 AND version = $7"#,
    )
    .bind(account.status.as_ref())
    .bind(account.balance.amount())
    .bind(account.available_balance.amount())
    .bind(&account.metadata)
    .bind(now)
    .bind(account.id.into_uuid())
    .bind(account.version)
    .execute(executor)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;
    Ok(result.rows_affected())
}

impl PgLedger {
    /// Creates a new PostgreSQL ledger with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a transaction for callers composing multiple ledger writes.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>, LedgerError> {
        self.pool
            .begin()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))
    }

    /// Locks the given accounts inside `tx` and returns them.
    ///
    /// Lock acquisition is strictly in ascending id order regardless of
    /// the order `ids` arrive in, so two transactions locking an
    /// overlapping set can never wait on each other in a cycle.
    pub async fn accounts_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ids: &[AccountId],
    ) -> Result<Vec<Account>, LedgerError> {
        let mut sorted: Vec<AccountId> = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut accounts = Vec::with_capacity(sorted.len());
        for id in sorted {
            let row: Option<DbAccount> = sqlx::query_as(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
            ))
            .bind(id.into_uuid())
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
impl LedgerRepository for PgLedger {
    async fn create_account(&self, req: NewAccount) -> Result<Account, LedgerError> {
        let mut account = Account::new(req.user_id, req.kind, req.currency);
        account.metadata = req.metadata;

        sqlx::query(
            r#"INSERT INTO accounts (id, user_id, kind, status, balance, available_balance, currency, metadata, created_at, updated_at, version)
               VALUES ($1, $2, $3, $4, 0, 0, $5, $6, $7, $8, 1)"#,
        )
        .bind(account.id.into_uuid())
        .bind(account.user_id)
        .bind(account.kind.as_ref())
        .bind(account.status.as_ref())
        .bind(account.currency().to_string())
        .bind(&account.metadata)
        .bind(account.created_at)
        .bind(account.updated_at)
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
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
                .bind(id.into_uuid())
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
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 AND kind = $2"
        ))
        .bind(user_id)
        .bind(kind.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn list_accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, LedgerError> {
        let rows: Vec<DbAccount> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(DbAccount::into_domain).collect()
    }

    async fn update_account(&self, account: &Account) -> Result<Account, LedgerError> {
        let now = Utc::now();
        let matched = apply_account_update(&self.pool, account, now).await?;

        if matched == 0 {
            // Zero rows means either a version race or a missing row;
            // re-check existence to report the right error.
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

        sqlx::query(
            r#"INSERT INTO api_tokens (id, user_id, token_prefix, token_hash, name, scopes, created_at, expires_at, version)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)"#,
        )
        .bind(token.id.into_uuid())
        .bind(token.user_id)
        .bind(&token.prefix)
        .bind(&token.hash)
        .bind(&token.name)
        .bind(&token.scopes)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok((token, secret))
    }

    async fn find_token_by_hash(&self, hash: &[u8]) -> Result<Option<ApiToken>, LedgerError> {
        let row: Option<DbApiToken> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE token_hash = $1 AND revoked_at IS NULL"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        row.map(DbApiToken::into_domain).transpose()
    }

    async fn touch_token(&self, id: ApiTokenId, ip: Option<&str>) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"UPDATE api_tokens SET last_used_at = $1, last_used_ip = $2 WHERE id = $3"#,
        )
        .bind(Utc::now())
        .bind(ip)
        .bind(id.into_uuid())
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
               SET revoked_at = $1, revoked_reason = $2, version = version + 1
               WHERE id = $3 AND revoked_at IS NULL"#,
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(id.into_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        let row: Option<DbApiToken> =
            sqlx::query_as(&format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE id = $1"))
                .bind(id.into_uuid())
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
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(DbApiToken::into_domain).collect()
    }
}
