//! Pure domain types: value objects and canonical result shapes.

pub mod account;
pub mod api_token;
pub mod money;
pub mod payment;
pub mod webhook;

pub use account::{Account, AccountId, AccountKind, AccountStatus};
pub use api_token::{ApiToken, ApiTokenId};
pub use money::{Currency, Money};
pub use payment::{
    DestinationKind, PaymentIntent, PaymentIntentStatus, PaymentMethodType, RefundResult,
    RefundStatus, TokenizedPaymentMethod, TransferDestination, TransferInitiation, TransferState,
    TransferStatus, error_code,
};
pub use webhook::{ProviderWebhookEvent, WebhookEventType};
