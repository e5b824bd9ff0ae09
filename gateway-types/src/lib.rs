//! # Gateway Types
//!
//! Domain types and port traits for the payment gateway. This crate has
//! ZERO external IO dependencies - only data structures, business rules,
//! and trait definitions.
//!
//! ## Architecture
//!
//! This crate is the innermost core of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, canonical results)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Request objects for the port boundaries
//! - `error/` - Error taxonomy

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, AccountKind, AccountStatus, ApiToken, ApiTokenId, Currency,
    DestinationKind, Money, PaymentIntent, PaymentIntentStatus, PaymentMethodType,
    ProviderWebhookEvent, RefundResult, RefundStatus, TokenizedPaymentMethod,
    TransferDestination, TransferInitiation, TransferState, TransferStatus, WebhookEventType,
    error_code,
};
pub use dto::*;
pub use error::{DomainError, GatewayError, LedgerError};
pub use ports::{LedgerRepository, PaymentGateway};
