//! Account domain model.
//!
//! Accounts carry a `version` counter for optimistic concurrency: every
//! successful write bumps it, and a write only succeeds when the stored
//! version matches the version the caller read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};
use crate::error::DomainError;

/// Unique identifier for an Account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random AccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AccountId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of balance an account tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Spendable user wallet.
    Wallet,
    /// Funds received but not yet settled.
    Settlement,
}

impl AsRef<str> for AccountKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::Wallet => "WALLET",
            Self::Settlement => "SETTLEMENT",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Lifecycle status of an account. Accounts are never hard-deleted;
/// they transition to `Closed` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Frozen,
    Closed,
}

impl AsRef<str> for AccountStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Frozen => "FROZEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A ledger account holding a balance for one user.
///
/// `balance` is the full booked amount; `available_balance` excludes
/// funds held for in-flight transfers, so `available_balance <= balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: Uuid,
    pub kind: AccountKind,
    pub status: AccountStatus,
    pub balance: Money,
    pub available_balance: Money,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter; bumped by the repository on every
    /// successful update.
    pub version: i64,
}

impl Account {
    /// Creates a new account with zero balance at version 1.
    pub fn new(user_id: Uuid, kind: AccountKind, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            user_id,
            kind,
            status: AccountStatus::Active,
            balance: Money::zero(currency),
            available_balance: Money::zero(currency),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Returns the currency of this account.
    pub fn currency(&self) -> Currency {
        self.balance.currency()
    }

    /// Credits money to both the booked and available balances.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_add(amount)?;
        self.available_balance = self.available_balance.checked_add(amount)?;
        Ok(())
    }

    /// Debits money from both the booked and available balances.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.available_balance = self.available_balance.checked_sub(amount)?;
        self.balance = self.balance.checked_sub(amount)?;
        Ok(())
    }

    /// Places a hold: reduces the available balance only, leaving the
    /// booked balance intact until the transfer settles.
    pub fn hold(&mut self, amount: Money) -> Result<(), DomainError> {
        self.available_balance = self.available_balance.checked_sub(amount)?;
        Ok(())
    }

    /// Releases a previously placed hold.
    pub fn release_hold(&mut self, amount: Money) -> Result<(), DomainError> {
        let released = self.available_balance.checked_add(amount)?;
        if released.amount() > self.balance.amount() {
            return Err(DomainError::Validation(
                "Cannot release more than is held".into(),
            ));
        }
        self.available_balance = released;
        Ok(())
    }

    /// Checks if the account has sufficient available funds for a debit.
    pub fn has_available(&self, amount: &Money) -> bool {
        self.available_balance.currency() == amount.currency()
            && self.available_balance.gte(amount)
    }
}
