//! Canonical webhook event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed vocabulary every provider event name maps onto.
///
/// `Unknown` is the benign fallback for provider events with no mapping;
/// unmapped events are surfaced, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded,
    #[serde(rename = "payment_intent.failed")]
    PaymentIntentFailed,
    #[serde(rename = "payout.paid")]
    PayoutPaid,
    #[serde(rename = "payout.failed")]
    PayoutFailed,
    #[serde(rename = "refund.succeeded")]
    RefundSucceeded,
    #[serde(rename = "refund.failed")]
    RefundFailed,
    #[serde(rename = "payment_method.verified")]
    PaymentMethodVerified,
    #[serde(rename = "unknown")]
    Unknown,
}

impl AsRef<str> for WebhookEventType {
    fn as_ref(&self) -> &str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.failed",
            Self::PayoutPaid => "payout.paid",
            Self::PayoutFailed => "payout.failed",
            Self::RefundSucceeded => "refund.succeeded",
            Self::RefundFailed => "refund.failed",
            Self::PaymentMethodVerified => "payment_method.verified",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A provider webhook delivery normalized into the canonical vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderWebhookEvent {
    pub event_type: WebhookEventType,
    /// Provider delivery id when supplied; otherwise a stable hash of
    /// the raw payload, so provider retries of the same delivery yield
    /// the same id.
    pub delivery_id: String,
    pub timestamp: DateTime<Utc>,
    /// The full provider payload, untouched, for downstream consumers.
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        let json = serde_json::to_string(&WebhookEventType::PaymentIntentSucceeded).unwrap();
        assert_eq!(json, r#""payment_intent.succeeded""#);

        let parsed: WebhookEventType = serde_json::from_str(r#""payout.failed""#).unwrap();
        assert_eq!(parsed, WebhookEventType::PayoutFailed);
    }
}
