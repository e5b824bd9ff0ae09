//! Ledger repository port trait.
//!
//! Adapters (Postgres, SQLite) implement this trait. Correctness under
//! concurrency comes from the database, not in-process locks: row-level
//! locks inside a transaction plus an optimistic version check on every
//! update. `LedgerError::OptimisticLock` is an expected, retryable
//! outcome; the caller re-reads and retries.

use uuid::Uuid;

use crate::domain::{Account, AccountId, AccountKind, ApiToken, ApiTokenId, Money};
use crate::dto::{NewAccount, NewApiToken};
use crate::error::LedgerError;

/// The persistence port for accounts and API tokens.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates an account. At most one account exists per (user, kind);
    /// a duplicate create fails with `LedgerError::Conflict`.
    async fn create_account(&self, req: NewAccount) -> Result<Account, LedgerError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    async fn find_account_for_user(
        &self,
        user_id: Uuid,
        kind: AccountKind,
    ) -> Result<Option<Account>, LedgerError>;

    async fn list_accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, LedgerError>;

    /// Persists the account with an optimistic version check: the UPDATE
    /// only matches when the stored version equals `account.version`,
    /// and sets `version + 1`. Returns the stored account (with the new
    /// version) on success, `OptimisticLock` when a concurrent writer
    /// got there first.
    async fn update_account(&self, account: &Account) -> Result<Account, LedgerError>;

    /// Atomically moves `amount` from one account to another. Both rows
    /// are locked via a row-locking read issued in ascending-id order,
    /// so overlapping transfers can never deadlock on lock ordering.
    async fn transfer_balance(
        &self,
        debit_id: AccountId,
        credit_id: AccountId,
        amount: Money,
    ) -> Result<(Account, Account), LedgerError>;

    // ─────────────────────────────────────────────────────────────────────────
    // API tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Mints a token, returning the stored row and the raw secret. The
    /// secret is never persisted; only its SHA-256 hash is.
    async fn create_api_token(
        &self,
        req: NewApiToken,
    ) -> Result<(ApiToken, String), LedgerError>;

    /// Looks a token up by secret hash, filtered to non-revoked rows.
    async fn find_token_by_hash(&self, hash: &[u8]) -> Result<Option<ApiToken>, LedgerError>;

    /// Records a successful use (timestamp + caller IP).
    async fn touch_token(
        &self,
        id: ApiTokenId,
        ip: Option<&str>,
    ) -> Result<(), LedgerError>;

    /// Revokes a token: timestamp + reason columns, never a DELETE, so
    /// the forensic trail survives. Version-checked like any update.
    async fn revoke_token(&self, id: ApiTokenId, reason: &str) -> Result<ApiToken, LedgerError>;

    async fn list_tokens_for_user(&self, user_id: Uuid) -> Result<Vec<ApiToken>, LedgerError>;
}
