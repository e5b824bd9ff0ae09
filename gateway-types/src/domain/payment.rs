//! Canonical payment result types.
//!
//! These are the provider-independent shapes every adapter maps into.
//! Field names are a wire contract consumers depend on; provider
//! failures are carried as data (`status: Failed` + `error_code`), never
//! as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable, provider-agnostic error codes suitable for display and for
/// driving business logic. Raw provider codes go in `error_message` for
/// diagnostics only.
pub mod error_code {
    pub const INVALID_DESTINATION: &str = "invalid_destination";
    pub const PROVIDER_ERROR: &str = "provider_error";
    pub const NETWORK_ERROR: &str = "network_error";
    pub const INSUFFICIENT_BALANCE: &str = "insufficient_balance";
    pub const DUPLICATE_REQUEST: &str = "duplicate_request";
    pub const NOT_FOUND: &str = "not_found";
}

/// Status of a payment intent (an incoming payment).
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    RequiresConfirmation,
}

impl PaymentIntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::RequiresConfirmation => "requires_confirmation",
        };
        write!(f, "{s}")
    }
}

/// An incoming payment tracked at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    /// Provider-specific handle the payer needs to complete the payment
    /// (a copy-and-paste QR payload, a checkout URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PaymentIntent {
    /// A failed intent carrying a canonical error code as data.
    pub fn failed(id: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: PaymentIntentStatus::Failed,
            client_secret: None,
            error_code: Some(code.to_string()),
            error_message: Some(message.into()),
        }
    }
}

/// Status of an outgoing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Result of initiating an outgoing transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferInitiation {
    pub id: String,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TransferInitiation {
    /// A failed initiation carrying a canonical error code as data.
    pub fn failed(id: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TransferStatus::Failed,
            estimated_arrival: None,
            error_code: Some(code.to_string()),
            error_message: Some(message.into()),
        }
    }
}

/// Point-in-time view of a transfer, from a status re-read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferState {
    pub id: String,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Status of a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Result of requesting a refund against a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub id: String,
    pub status: RefundStatus,
    /// The provider transaction the refund was issued against.
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RefundResult {
    pub fn failed(
        id: impl Into<String>,
        external_reference: impl Into<String>,
        code: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status: RefundStatus::Failed,
            external_reference: external_reference.into(),
            error_code: Some(code.to_string()),
            error_message: Some(message.into()),
        }
    }
}

/// Broad classification of a tokenized destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    InstantKey,
    BankAccount,
    EWallet,
}

/// A durable reference to a payer-owned destination, verified against
/// the provider's directory where one exists. No secrets are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizedPaymentMethod {
    pub external_id: String,
    pub method_type: PaymentMethodType,
    /// Masked, user-displayable identifier. Never contains more than
    /// the last 4 characters of a sensitive value (last 8 for long
    /// random keys).
    pub display_name: String,
    pub is_withdrawable: bool,
    pub metadata: serde_json::Value,
}

/// The rail-specific shape of a destination identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// Key-based rail: `"type:value"` (tax id, phone, email, random key).
    InstantKey,
    /// Account-based rail: `"channel:account:holder_name"`.
    ChannelAccount,
}

/// An opaque transfer destination. Adapters parse `external_id` into
/// provider-specific fields and reject malformed input with
/// `invalid_destination` before any network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDestination {
    pub kind: DestinationKind,
    pub external_id: String,
}

impl TransferDestination {
    pub fn instant_key(external_id: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::InstantKey,
            external_id: external_id.into(),
        }
    }

    pub fn channel_account(external_id: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::ChannelAccount,
            external_id: external_id.into(),
        }
    }
}
