//! Xendit adapter: maps the canonical gateway contract onto a
//! multi-rail processor (invoices in, disbursements out, bank and
//! e-wallet channels).

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use gateway_types::{
    Currency, GatewayError, PaymentIntent, PaymentIntentRequest, PaymentIntentStatus,
    PaymentMethodType, ProviderWebhookEvent, RefundRequest, RefundResult, RefundStatus,
    TokenizeRequest, TokenizedPaymentMethod, TransferInitiation, TransferRequest, TransferState,
    TransferStatus, WebhookEventType, error_code,
};

use crate::config::XenditConfig;
use crate::delivery;
use crate::mask::mask_key;
use crate::signature;
use crate::xendit::client::XenditApiClient;

const PROVIDER_NAME: &str = "xendit";

const BANK_CHANNELS: &[&str] = &["BCA", "BNI", "BRI", "MANDIRI", "PERMATA"];
const EWALLET_CHANNELS: &[&str] = &["OVO", "GOPAY", "DANA"];

pub struct XenditGateway {
    client: XenditApiClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Bank,
    EWallet,
}

/// A parsed disbursement destination. The wire encoding is
/// `"CHANNEL:account:holder_name"`; the holder name may contain spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDestination {
    pub channel: String,
    pub kind: ChannelKind,
    pub account: String,
    pub holder_name: String,
}

impl ChannelDestination {
    pub fn parse(external_id: &str) -> Result<Self, String> {
        let mut parts = external_id.splitn(3, ':');
        let (channel, account, holder_name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(a), Some(h)) if !h.is_empty() => (c, a, h),
            _ => {
                return Err(format!(
                    "destination must be \"CHANNEL:account:holder_name\", got {external_id:?}"
                ));
            }
        };

        let channel = channel.to_uppercase();
        let kind = if BANK_CHANNELS.contains(&channel.as_str()) {
            ChannelKind::Bank
        } else if EWALLET_CHANNELS.contains(&channel.as_str()) {
            ChannelKind::EWallet
        } else {
            return Err(format!("unknown channel {channel:?}"));
        };

        match kind {
            ChannelKind::Bank => {
                if !(6..=16).contains(&account.len())
                    || !account.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err("bank account number must be 6 to 16 digits".to_string());
                }
            }
            ChannelKind::EWallet => {
                let digits = account.strip_prefix("+62").unwrap_or("");
                if !(9..=12).contains(&digits.len())
                    || !digits.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err("e-wallet account must be a +62 phone number".to_string());
                }
            }
        }

        Ok(Self {
            channel,
            kind,
            account: account.to_string(),
            holder_name: holder_name.to_string(),
        })
    }

    /// Masked, user-displayable rendering, e.g. `"BCA ••••7890"`.
    pub fn display(&self) -> String {
        format!("{} {}", self.channel, mask_key(&self.account))
    }
}

fn map_invoice_status(status: &str) -> PaymentIntentStatus {
    match status {
        "PENDING" => PaymentIntentStatus::Processing,
        "PAID" | "SETTLED" => PaymentIntentStatus::Succeeded,
        "EXPIRED" => PaymentIntentStatus::Cancelled,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown invoice status");
            PaymentIntentStatus::Processing
        }
    }
}

fn map_disbursement_status(status: &str) -> TransferStatus {
    match status {
        "PENDING" => TransferStatus::Pending,
        "ACCEPTED" | "LOCKED" | "REQUESTED" => TransferStatus::Processing,
        "COMPLETED" => TransferStatus::Completed,
        "FAILED" | "CANCELLED" | "REVERSED" => TransferStatus::Failed,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown disbursement status");
            TransferStatus::Pending
        }
    }
}

fn map_refund_status(status: &str) -> RefundStatus {
    match status {
        "PENDING" => RefundStatus::Pending,
        "SUCCEEDED" => RefundStatus::Succeeded,
        "FAILED" => RefundStatus::Failed,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown refund status");
            RefundStatus::Pending
        }
    }
}

fn map_event_name(name: &str) -> WebhookEventType {
    match name {
        "invoice.paid" => WebhookEventType::PaymentIntentSucceeded,
        "invoice.expired" => WebhookEventType::PaymentIntentFailed,
        "disbursement.completed" => WebhookEventType::PayoutPaid,
        "disbursement.failed" => WebhookEventType::PayoutFailed,
        "refund.succeeded" => WebhookEventType::RefundSucceeded,
        "refund.failed" => WebhookEventType::RefundFailed,
        "payment_method.verified" => WebhookEventType::PaymentMethodVerified,
        other => {
            debug!(provider = PROVIDER_NAME, event = other, "unmapped webhook event");
            WebhookEventType::Unknown
        }
    }
}

/// Older callbacks carry no event name, only the resource status. The
/// resource kind is told apart by its fields: invoices carry
/// `invoice_url`, disbursements carry `bank_code`.
fn derive_event_from_status(data: &serde_json::Value) -> WebhookEventType {
    let Some(status) = data.get("status").and_then(|v| v.as_str()) else {
        return WebhookEventType::Unknown;
    };
    let is_disbursement = data.get("bank_code").is_some();
    match (status, is_disbursement) {
        ("PAID" | "SETTLED", false) => WebhookEventType::PaymentIntentSucceeded,
        ("EXPIRED", false) => WebhookEventType::PaymentIntentFailed,
        ("COMPLETED", true) => WebhookEventType::PayoutPaid,
        ("FAILED", true) => WebhookEventType::PayoutFailed,
        _ => WebhookEventType::Unknown,
    }
}

impl XenditGateway {
    pub fn new(config: XenditConfig) -> Self {
        Self {
            client: XenditApiClient::new(config),
        }
    }

    fn config(&self) -> &XenditConfig {
        self.client.config()
    }

    fn require_supported_currency(
        &self,
        amount: &gateway_types::Money,
    ) -> Result<(), GatewayError> {
        if !matches!(amount.currency(), Currency::IDR | Currency::PHP) {
            return Err(GatewayError::Validation(format!(
                "xendit settles IDR or PHP, got {}",
                amount.currency()
            )));
        }
        if amount.amount() <= 0 {
            return Err(GatewayError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Minor units to the decimal major units this wire expects.
fn to_major_units(amount: &gateway_types::Money) -> f64 {
    amount.amount() as f64 / 100.0
}

#[async_trait::async_trait]
impl gateway_types::PaymentGateway for XenditGateway {
    async fn create_payment_intent(
        &self,
        req: PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.require_supported_currency(&req.amount)?;
        let currency = req.amount.currency().to_string();

        match self
            .client
            .create_invoice(
                &req.idempotency_key,
                to_major_units(&req.amount),
                &currency,
                req.description.as_deref(),
            )
            .await
        {
            Ok(invoice) => Ok(PaymentIntent {
                id: invoice.id,
                status: map_invoice_status(&invoice.status),
                client_secret: invoice.invoice_url,
                error_code: None,
                error_message: None,
            }),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, key = req.idempotency_key, error = %err, "invoice creation failed");
                Ok(PaymentIntent::failed(
                    req.idempotency_key,
                    err.canonical_code(),
                    err.to_string(),
                ))
            }
        }
    }

    async fn confirm_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        match self.client.get_invoice(id).await {
            Ok(invoice) => Ok(PaymentIntent {
                id: invoice.id,
                status: map_invoice_status(&invoice.status),
                client_secret: invoice.invoice_url,
                error_code: None,
                error_message: None,
            }),
            Err(err) => Ok(PaymentIntent::failed(id, err.canonical_code(), err.to_string())),
        }
    }

    async fn cancel_payment_intent(&self, id: &str) -> Result<(), GatewayError> {
        // Best effort: a paid invoice cannot be expired, and that is fine.
        if let Err(err) = self.client.expire_invoice(id).await {
            warn!(provider = PROVIDER_NAME, invoice = id, error = %err, "invoice expiry failed");
        }
        Ok(())
    }

    async fn initiate_transfer(
        &self,
        req: TransferRequest,
    ) -> Result<TransferInitiation, GatewayError> {
        self.require_supported_currency(&req.amount)?;

        let destination = match ChannelDestination::parse(&req.destination.external_id) {
            Ok(d) => d,
            Err(reason) => {
                return Ok(TransferInitiation::failed(
                    req.idempotency_key,
                    error_code::INVALID_DESTINATION,
                    reason,
                ));
            }
        };

        let estimated_arrival = match destination.kind {
            ChannelKind::EWallet => Utc::now(),
            ChannelKind::Bank => Utc::now() + Duration::hours(1),
        };

        match self
            .client
            .create_disbursement(
                &req.idempotency_key,
                to_major_units(&req.amount),
                &destination.channel,
                &destination.holder_name,
                &destination.account,
            )
            .await
        {
            Ok(disbursement) => Ok(TransferInitiation {
                id: disbursement.id,
                status: map_disbursement_status(&disbursement.status),
                estimated_arrival: Some(estimated_arrival),
                error_code: None,
                error_message: disbursement.failure_code,
            }),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, key = req.idempotency_key, error = %err, "disbursement failed");
                let code = match &err {
                    crate::error::ProviderApiError::Api { code, .. }
                        if code == "INSUFFICIENT_BALANCE" =>
                    {
                        error_code::INSUFFICIENT_BALANCE
                    }
                    crate::error::ProviderApiError::Api { code, .. }
                        if code == "INVALID_DESTINATION" =>
                    {
                        error_code::INVALID_DESTINATION
                    }
                    _ => err.canonical_code(),
                };
                Ok(TransferInitiation::failed(req.idempotency_key, code, err.to_string()))
            }
        }
    }

    async fn get_transfer_status(&self, id: &str) -> Result<TransferState, GatewayError> {
        match self.client.get_disbursement(id).await {
            Ok(disbursement) => Ok(TransferState {
                id: disbursement.id,
                status: map_disbursement_status(&disbursement.status),
                estimated_arrival: None,
                failure_reason: disbursement.failure_code,
            }),
            Err(err) => Ok(TransferState {
                id: id.to_string(),
                status: TransferStatus::Failed,
                estimated_arrival: None,
                failure_reason: Some(err.to_string()),
            }),
        }
    }

    async fn cancel_transfer(&self, id: &str) -> Result<(), GatewayError> {
        // No cancel primitive once a disbursement is accepted; callers
        // must wait for the terminal status.
        debug!(provider = PROVIDER_NAME, disbursement = id, "cancel requested");
        Err(GatewayError::Unsupported {
            provider: PROVIDER_NAME,
            operation: "cancel_transfer",
            reason: "disbursements cannot be cancelled once submitted",
        })
    }

    async fn tokenize_payment_method(
        &self,
        req: TokenizeRequest,
    ) -> Result<TokenizedPaymentMethod, GatewayError> {
        let destination =
            ChannelDestination::parse(&req.external_id).map_err(GatewayError::Validation)?;

        // Banks get a live holder-name check; e-wallets have no lookup.
        if destination.kind == ChannelKind::Bank {
            let validation = self
                .client
                .validate_name(&destination.channel, &destination.account)
                .await
                .map_err(|err| GatewayError::Provider {
                    code: err.canonical_code().to_string(),
                    message: err.to_string(),
                })?;
            if validation.status != "SUCCESS" {
                return Err(GatewayError::Provider {
                    code: error_code::INVALID_DESTINATION.to_string(),
                    message: format!(
                        "account did not validate: {}",
                        validation.status
                    ),
                });
            }
        }

        let method_type = match destination.kind {
            ChannelKind::Bank => PaymentMethodType::BankAccount,
            ChannelKind::EWallet => PaymentMethodType::EWallet,
        };
        Ok(TokenizedPaymentMethod {
            external_id: req.external_id,
            method_type,
            display_name: destination.display(),
            is_withdrawable: true,
            metadata: serde_json::json!({
                "channel": destination.channel,
                "holder_name": destination.holder_name,
            }),
        })
    }

    async fn verify_payment_method(&self, external_id: &str) -> Result<bool, GatewayError> {
        let destination =
            ChannelDestination::parse(external_id).map_err(GatewayError::Validation)?;
        match destination.kind {
            // Phone-addressed wallets are verified at first transfer.
            ChannelKind::EWallet => Ok(true),
            ChannelKind::Bank => {
                let validation = self
                    .client
                    .validate_name(&destination.channel, &destination.account)
                    .await
                    .map_err(|err| GatewayError::Provider {
                        code: err.canonical_code().to_string(),
                        message: err.to_string(),
                    })?;
                Ok(validation.status == "SUCCESS")
            }
        }
    }

    async fn delete_payment_method(&self, external_id: &str) -> Result<(), GatewayError> {
        // Destinations are not stored provider-side; deletion is local.
        debug!(provider = PROVIDER_NAME, external_id, "payment method deletion is a no-op");
        Ok(())
    }

    async fn create_refund(&self, req: RefundRequest) -> Result<RefundResult, GatewayError> {
        self.require_supported_currency(&req.amount)?;

        match self
            .client
            .create_refund(
                &req.idempotency_key,
                &req.external_transaction_id,
                to_major_units(&req.amount),
            )
            .await
        {
            Ok(refund) => Ok(RefundResult {
                id: refund.id,
                status: map_refund_status(&refund.status),
                external_reference: req.external_transaction_id,
                error_code: None,
                error_message: refund.failure_code,
            }),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, key = req.idempotency_key, error = %err, "refund failed");
                Ok(RefundResult::failed(
                    req.idempotency_key,
                    req.external_transaction_id,
                    err.canonical_code(),
                    err.to_string(),
                ))
            }
        }
    }

    fn verify_webhook_signature(&self, _payload: &[u8], token: &str) -> bool {
        // This provider signs nothing; it sends a static callback token.
        signature::verify_shared_token(token, &self.config().callback_token)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<ProviderWebhookEvent, GatewayError> {
        let data: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::Validation(format!("malformed webhook payload: {e}")))?;

        let event_type = match data.get("event").and_then(|v| v.as_str()) {
            Some(name) => map_event_name(name),
            None => derive_event_from_status(&data),
        };

        let timestamp = data
            .get("updated")
            .or_else(|| data.get("created"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Utc::now);

        Ok(ProviderWebhookEvent {
            event_type,
            delivery_id: delivery::delivery_id(
                data.get("webhook_id")
                    .or_else(|| data.get("id"))
                    .and_then(|v| v.as_str()),
                payload,
            ),
            timestamp,
            data,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
