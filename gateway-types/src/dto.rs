//! Request objects crossing the port boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountKind, Currency, DestinationKind, Money, TransferDestination};

// ─────────────────────────────────────────────────────────────────────────────
// Gateway requests
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a payment intent (an incoming payment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: Money,
    /// Caller-supplied key; a retried request must have the same effect
    /// as a single successful one.
    pub idempotency_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Request to initiate an outgoing transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub amount: Money,
    pub destination: TransferDestination,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Request to refund a settled provider transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub external_transaction_id: String,
    pub amount: Money,
    pub idempotency_key: String,
}

/// Request to tokenize a payer-owned destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeRequest {
    pub kind: DestinationKind,
    /// Same encoding as [`TransferDestination::external_id`].
    pub external_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger requests
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a ledger account. One account exists per
/// (user, kind); a second create is a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub kind: AccountKind,
    pub currency: Currency,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Request to mint an API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApiToken {
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
