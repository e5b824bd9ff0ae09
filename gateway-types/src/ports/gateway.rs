//! Payment gateway port trait.
//!
//! Every provider adapter implements this contract. The non-throwing
//! rule for financial operations: a provider rejecting or failing an
//! operation comes back as `Ok` with a `Failed` status and a canonical
//! `error_code`; `Err` is reserved for caller and configuration bugs.

use crate::domain::{
    PaymentIntent, ProviderWebhookEvent, RefundResult, TokenizedPaymentMethod, TransferInitiation,
    TransferState,
};
use crate::dto::{PaymentIntentRequest, RefundRequest, TokenizeRequest, TransferRequest};
use crate::error::GatewayError;

/// The capability set every payment service provider adapter satisfies.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Payment intents (incoming payments)
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a payment intent. Provider failures are returned as a
    /// `Failed` intent, never as `Err`.
    async fn create_payment_intent(
        &self,
        req: PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Idempotent re-read of provider state; re-invoking after a
    /// terminal status returns the same terminal status.
    async fn confirm_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Best-effort cancellation. Providers without a cancel primitive
    /// may no-op; provider rejections are logged and swallowed (the
    /// payment will expire instead).
    async fn cancel_payment_intent(&self, id: &str) -> Result<(), GatewayError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transfers (outgoing payments)
    // ─────────────────────────────────────────────────────────────────────────

    /// Initiates a transfer. A malformed destination yields a `Failed`
    /// initiation with `error_code = "invalid_destination"`.
    async fn initiate_transfer(
        &self,
        req: TransferRequest,
    ) -> Result<TransferInitiation, GatewayError>;

    async fn get_transfer_status(&self, id: &str) -> Result<TransferState, GatewayError>;

    /// May legitimately be `Err(GatewayError::Unsupported)` for rails
    /// whose transfers are instant and irrevocable.
    async fn cancel_transfer(&self, id: &str) -> Result<(), GatewayError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Payment methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Tokenizes a destination, performing a live directory lookup when
    /// the provider exposes one. `display_name` is always masked.
    async fn tokenize_payment_method(
        &self,
        req: TokenizeRequest,
    ) -> Result<TokenizedPaymentMethod, GatewayError>;

    async fn verify_payment_method(&self, external_id: &str) -> Result<bool, GatewayError>;

    async fn delete_payment_method(&self, external_id: &str) -> Result<(), GatewayError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Refunds
    // ─────────────────────────────────────────────────────────────────────────

    /// Same non-throwing contract as payment intents.
    async fn create_refund(&self, req: RefundRequest) -> Result<RefundResult, GatewayError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Constant-time signature check. Must return `false`, never panic,
    /// for attacker-controlled input of any length.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;

    /// Normalizes a provider delivery into the canonical vocabulary.
    /// Unmapped provider events map to `WebhookEventType::Unknown`.
    fn parse_webhook_event(&self, payload: &[u8]) -> Result<ProviderWebhookEvent, GatewayError>;

    /// Short provider identifier for logs and error messages.
    fn name(&self) -> &'static str;
}
