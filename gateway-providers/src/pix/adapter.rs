//! PIX adapter: maps the canonical gateway contract onto the instant
//! payment rail (charges, payouts, refunds, key directory, webhooks).

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use gateway_types::{
    Currency, GatewayError, PaymentIntent, PaymentIntentRequest, PaymentIntentStatus,
    PaymentMethodType, ProviderWebhookEvent, RefundRequest, RefundResult, RefundStatus,
    TokenizeRequest, TokenizedPaymentMethod, TransferInitiation, TransferRequest, TransferState,
    TransferStatus, WebhookEventType, error_code,
};

use crate::config::PixConfig;
use crate::delivery;
use crate::mask::{mask_email, mask_key};
use crate::pix::brcode::BrCode;
use crate::pix::client::PixApiClient;
use crate::signature;

const PROVIDER_NAME: &str = "pix";

/// Transaction ids on this rail are 26 to 35 alphanumeric characters.
const TXID_MIN: usize = 26;
const TXID_MAX: usize = 35;

pub struct PixGateway {
    client: PixApiClient,
}

/// A parsed receiving key. The wire encoding is `"type:value"` with
/// exactly one colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixKey {
    Cpf(String),
    Cnpj(String),
    Phone(String),
    Email(String),
    Random(String),
}

impl PixKey {
    /// Parses a `"type:value"` destination. Malformed input is an
    /// ordinary parse failure, reported before any network call.
    pub fn parse(external_id: &str) -> Result<Self, String> {
        let mut parts = external_id.splitn(3, ':');
        let (kind, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(value), None) => (kind, value),
            _ => {
                return Err(format!(
                    "destination must be \"type:value\" with exactly one colon, got {external_id:?}"
                ));
            }
        };
        match kind {
            "cpf" => {
                if value.len() == 11 && value.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(Self::Cpf(value.to_string()))
                } else {
                    Err("cpf key must be exactly 11 digits".to_string())
                }
            }
            "cnpj" => {
                if value.len() == 14 && value.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(Self::Cnpj(value.to_string()))
                } else {
                    Err("cnpj key must be exactly 14 digits".to_string())
                }
            }
            "phone" => {
                let digits = value.strip_prefix("+55").unwrap_or("");
                if (10..=11).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
                {
                    Ok(Self::Phone(value.to_string()))
                } else {
                    Err("phone key must be +55 followed by 10 or 11 digits".to_string())
                }
            }
            "email" => {
                if value.contains('@') && !value.starts_with('@') && !value.ends_with('@') {
                    Ok(Self::Email(value.to_string()))
                } else {
                    Err("email key must contain a local part and a domain".to_string())
                }
            }
            "random" => {
                if uuid::Uuid::parse_str(value).is_ok() {
                    Ok(Self::Random(value.to_string()))
                } else {
                    Err("random key must be a UUID".to_string())
                }
            }
            other => Err(format!("unknown key type {other:?}")),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Cpf(v) | Self::Cnpj(v) | Self::Phone(v) | Self::Email(v) | Self::Random(v) => v,
        }
    }

    /// Masked, user-displayable rendering.
    pub fn display(&self) -> String {
        match self {
            Self::Email(v) => mask_email(v),
            _ => mask_key(self.value()),
        }
    }
}

/// Hash suffix length appended to every derived transaction id.
const TXID_SUFFIX: usize = 12;

/// Derives a deterministic transaction id from a caller idempotency
/// key, so a retried request targets the same provider resource. A
/// sanitized prefix keeps the id recognizable; the hash suffix binds
/// it to the whole key, so keys that share a long common prefix still
/// get distinct ids.
pub fn derive_txid(idempotency_key: &str) -> String {
    let digest = hex::encode(Sha256::digest(idempotency_key.as_bytes()));
    let prefix: String = idempotency_key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(TXID_MAX - TXID_SUFFIX)
        .collect();
    let suffix_len = TXID_SUFFIX.max(TXID_MIN.saturating_sub(prefix.len()));
    format!("{prefix}{}", &digest[..suffix_len])
}

fn map_charge_status(status: &str) -> PaymentIntentStatus {
    match status {
        "ATIVA" => PaymentIntentStatus::Processing,
        "CONCLUIDA" => PaymentIntentStatus::Succeeded,
        s if s.starts_with("REMOVIDA") => PaymentIntentStatus::Cancelled,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown charge status");
            PaymentIntentStatus::Processing
        }
    }
}

fn map_payout_status(status: &str) -> TransferStatus {
    match status {
        "EM_PROCESSAMENTO" => TransferStatus::Processing,
        "REALIZADO" => TransferStatus::Completed,
        "NAO_REALIZADO" => TransferStatus::Failed,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown payout status");
            TransferStatus::Processing
        }
    }
}

fn map_refund_status(status: &str) -> RefundStatus {
    match status {
        "EM_PROCESSAMENTO" => RefundStatus::Pending,
        "DEVOLVIDO" => RefundStatus::Succeeded,
        "NAO_REALIZADO" => RefundStatus::Failed,
        other => {
            warn!(provider = PROVIDER_NAME, status = other, "unknown refund status");
            RefundStatus::Pending
        }
    }
}

fn map_event_name(name: &str) -> WebhookEventType {
    match name {
        "cob.paid" => WebhookEventType::PaymentIntentSucceeded,
        "cob.expired" => WebhookEventType::PaymentIntentFailed,
        "payout.completed" => WebhookEventType::PayoutPaid,
        "payout.rejected" => WebhookEventType::PayoutFailed,
        "devolucao.completed" => WebhookEventType::RefundSucceeded,
        "devolucao.rejected" => WebhookEventType::RefundFailed,
        "dict.key.verified" => WebhookEventType::PaymentMethodVerified,
        other => {
            debug!(provider = PROVIDER_NAME, event = other, "unmapped webhook event");
            WebhookEventType::Unknown
        }
    }
}

impl PixGateway {
    pub fn new(config: PixConfig) -> Self {
        Self {
            client: PixApiClient::new(config),
        }
    }

    fn config(&self) -> &PixConfig {
        self.client.config()
    }

    fn require_brl(&self, amount: &gateway_types::Money) -> Result<(), GatewayError> {
        if amount.currency() != Currency::BRL {
            return Err(GatewayError::Validation(format!(
                "pix only settles BRL, got {}",
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

    /// A reusable receive code. The amount is optional; without one the
    /// payer types an amount in.
    pub fn create_static_qr_code(
        &self,
        amount: Option<&gateway_types::Money>,
        description: Option<&str>,
    ) -> Result<String, GatewayError> {
        if let Some(amount) = amount {
            self.require_brl(amount)?;
        }
        BrCode {
            key: self.config().receiving_key.clone(),
            merchant_name: self.config().merchant_name.clone(),
            merchant_city: self.config().merchant_city.clone(),
            amount: amount.copied(),
            description: description.map(str::to_string),
            txid: None,
        }
        .encode()
        .map_err(|e| GatewayError::Configuration(e.to_string()))
    }

    /// A single-use receive code bound to one charge and amount.
    pub fn create_dynamic_qr_code(
        &self,
        amount: &gateway_types::Money,
        txid: &str,
    ) -> Result<String, GatewayError> {
        BrCode {
            key: self.config().receiving_key.clone(),
            merchant_name: self.config().merchant_name.clone(),
            merchant_city: self.config().merchant_city.clone(),
            amount: Some(*amount),
            description: None,
            txid: Some(txid.to_string()),
        }
        .encode()
        .map_err(|e| GatewayError::Configuration(e.to_string()))
    }
}

#[async_trait::async_trait]
impl gateway_types::PaymentGateway for PixGateway {
    async fn create_payment_intent(
        &self,
        req: PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.require_brl(&req.amount)?;
        let txid = derive_txid(&req.idempotency_key);

        match self
            .client
            .create_charge(&txid, &req.amount.to_decimal_string(), req.description.as_deref())
            .await
        {
            Ok(charge) => {
                let code = match charge.copy_paste_code {
                    Some(code) => code,
                    None => self.create_dynamic_qr_code(&req.amount, &charge.txid)?,
                };
                Ok(PaymentIntent {
                    id: charge.txid,
                    status: map_charge_status(&charge.status),
                    client_secret: Some(code),
                    error_code: None,
                    error_message: None,
                })
            }
            Err(err) => {
                warn!(provider = PROVIDER_NAME, txid, error = %err, "charge creation failed");
                Ok(PaymentIntent::failed(txid, err.canonical_code(), err.to_string()))
            }
        }
    }

    async fn confirm_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        match self.client.get_charge(id).await {
            Ok(charge) => Ok(PaymentIntent {
                id: charge.txid,
                status: map_charge_status(&charge.status),
                client_secret: charge.copy_paste_code,
                error_code: None,
                error_message: None,
            }),
            Err(err) => Ok(PaymentIntent::failed(id, err.canonical_code(), err.to_string())),
        }
    }

    async fn cancel_payment_intent(&self, id: &str) -> Result<(), GatewayError> {
        // Best effort: an uncancellable charge simply expires.
        if let Err(err) = self.client.remove_charge(id).await {
            warn!(provider = PROVIDER_NAME, txid = id, error = %err, "charge removal failed");
        }
        Ok(())
    }

    async fn initiate_transfer(
        &self,
        req: TransferRequest,
    ) -> Result<TransferInitiation, GatewayError> {
        self.require_brl(&req.amount)?;
        let id = derive_txid(&req.idempotency_key);

        let key = match PixKey::parse(&req.destination.external_id) {
            Ok(key) => key,
            Err(reason) => {
                return Ok(TransferInitiation::failed(
                    id,
                    error_code::INVALID_DESTINATION,
                    reason,
                ));
            }
        };

        match self
            .client
            .create_payout(&id, &req.amount.to_decimal_string(), key.value())
            .await
        {
            Ok(payout) => Ok(TransferInitiation {
                id: payout.id,
                status: map_payout_status(&payout.status),
                // Instant rail: funds land within seconds of acceptance.
                estimated_arrival: Some(Utc::now()),
                error_code: None,
                error_message: payout.motivo,
            }),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, payout = id, error = %err, "payout failed");
                Ok(TransferInitiation::failed(id, err.canonical_code(), err.to_string()))
            }
        }
    }

    async fn get_transfer_status(&self, id: &str) -> Result<TransferState, GatewayError> {
        match self.client.get_payout(id).await {
            Ok(payout) => Ok(TransferState {
                id: payout.id,
                status: map_payout_status(&payout.status),
                estimated_arrival: None,
                failure_reason: payout.motivo,
            }),
            Err(err) => Ok(TransferState {
                id: id.to_string(),
                status: TransferStatus::Failed,
                estimated_arrival: None,
                failure_reason: Some(err.to_string()),
            }),
        }
    }

    async fn cancel_transfer(&self, _id: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported {
            provider: PROVIDER_NAME,
            operation: "cancel_transfer",
            reason: "transfers on this rail are instant and irrevocable",
        })
    }

    async fn tokenize_payment_method(
        &self,
        req: TokenizeRequest,
    ) -> Result<TokenizedPaymentMethod, GatewayError> {
        let key = PixKey::parse(&req.external_id).map_err(GatewayError::Validation)?;

        // Live directory lookup; a key that does not resolve cannot be
        // tokenized.
        let entry = self
            .client
            .lookup_key(key.value())
            .await
            .map_err(|err| GatewayError::Provider {
                code: err.canonical_code().to_string(),
                message: err.to_string(),
            })?;

        Ok(TokenizedPaymentMethod {
            external_id: req.external_id,
            method_type: PaymentMethodType::InstantKey,
            display_name: key.display(),
            is_withdrawable: true,
            metadata: serde_json::json!({
                "owner_name": entry.owner_name,
                "key_type": entry.key_type,
                "participant": entry.participante,
            }),
        })
    }

    async fn verify_payment_method(&self, external_id: &str) -> Result<bool, GatewayError> {
        let key = PixKey::parse(external_id).map_err(GatewayError::Validation)?;
        match self.client.lookup_key(key.value()).await {
            Ok(_) => Ok(true),
            Err(err) if err.canonical_code() == error_code::NOT_FOUND => Ok(false),
            Err(err) => Err(GatewayError::Provider {
                code: err.canonical_code().to_string(),
                message: err.to_string(),
            }),
        }
    }

    async fn delete_payment_method(&self, external_id: &str) -> Result<(), GatewayError> {
        // Nothing is stored provider-side for a key; deletion is local.
        debug!(provider = PROVIDER_NAME, external_id, "payment method deletion is a no-op");
        Ok(())
    }

    async fn create_refund(&self, req: RefundRequest) -> Result<RefundResult, GatewayError> {
        self.require_brl(&req.amount)?;
        let refund_id = derive_txid(&req.idempotency_key);

        match self
            .client
            .create_refund(
                &req.external_transaction_id,
                &refund_id,
                &req.amount.to_decimal_string(),
            )
            .await
        {
            Ok(refund) => Ok(RefundResult {
                id: refund.id,
                status: map_refund_status(&refund.status),
                external_reference: req.external_transaction_id,
                error_code: None,
                error_message: refund.motivo,
            }),
            Err(err) => {
                warn!(provider = PROVIDER_NAME, refund = refund_id, error = %err, "refund failed");
                Ok(RefundResult::failed(
                    refund_id,
                    req.external_transaction_id,
                    err.canonical_code(),
                    err.to_string(),
                ))
            }
        }
    }

    fn verify_webhook_signature(&self, payload: &[u8], sig: &str) -> bool {
        signature::verify_hmac(payload, sig, &self.config().webhook_secret)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<ProviderWebhookEvent, GatewayError> {
        let data: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::Validation(format!("malformed webhook payload: {e}")))?;

        let event_type = data
            .get("event")
            .and_then(|v| v.as_str())
            .map(map_event_name)
            .unwrap_or(WebhookEventType::Unknown);

        let timestamp = data
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Utc::now);

        Ok(ProviderWebhookEvent {
            event_type,
            delivery_id: delivery::delivery_id(
                data.get("id").and_then(|v| v.as_str()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::{Money, PaymentGateway, TransferDestination};

    fn test_gateway() -> PixGateway {
        PixGateway::new(PixConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            receiving_key: "123e4567-e89b-42d3-a456-426614174000".to_string(),
            merchant_name: "Loja Exemplo".to_string(),
            merchant_city: "SAO PAULO".to_string(),
            webhook_secret: "whsec".to_string(),
        })
    }

    #[test]
    fn test_key_parsing_accepts_all_types() {
        assert!(matches!(PixKey::parse("cpf:12345678901"), Ok(PixKey::Cpf(_))));
        assert!(matches!(PixKey::parse("cnpj:12345678000199"), Ok(PixKey::Cnpj(_))));
        assert!(matches!(PixKey::parse("phone:+5511987654321"), Ok(PixKey::Phone(_))));
        assert!(matches!(PixKey::parse("email:ana@example.com"), Ok(PixKey::Email(_))));
        assert!(matches!(
            PixKey::parse("random:123e4567-e89b-42d3-a456-426614174000"),
            Ok(PixKey::Random(_))
        ));
    }

    #[test]
    fn test_key_parsing_rejects_malformed_input() {
        assert!(PixKey::parse("cpf:123").is_err());
        assert!(PixKey::parse("cpf:1234567890a").is_err());
        assert!(PixKey::parse("cnpj:12345678901").is_err());
        assert!(PixKey::parse("phone:11987654321").is_err());
        assert!(PixKey::parse("email:notanemail").is_err());
        assert!(PixKey::parse("random:not-a-uuid").is_err());
        assert!(PixKey::parse("pixkey").is_err());
        assert!(PixKey::parse("cpf:123:extra").is_err());
        assert!(PixKey::parse("iban:BR1234567890").is_err());
    }

    #[test]
    fn test_txid_derivation() {
        let txid = derive_txid("order-2024-0001");
        assert!(txid.len() >= TXID_MIN && txid.len() <= TXID_MAX);
        assert!(txid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(txid, derive_txid("order-2024-0001"));
        assert_ne!(txid, derive_txid("order-2024-0002"));

        let long = derive_txid(&"x".repeat(100));
        assert_eq!(long.len(), TXID_MAX);
    }

    #[test]
    fn test_txid_binds_to_the_whole_key() {
        // Keys that agree on a long alphanumeric prefix must still get
        // distinct ids, or two logical requests would alias one charge.
        let base = "a".repeat(TXID_MAX);
        let a = derive_txid(&base);
        let b = derive_txid(&format!("{base}-x"));
        let c = derive_txid(&format!("{base}zzz"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
        for txid in [&a, &b, &c] {
            assert!(txid.len() >= TXID_MIN && txid.len() <= TXID_MAX);
            assert!(txid.chars().all(|ch| ch.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_charge_status_mapping() {
        assert_eq!(map_charge_status("ATIVA"), PaymentIntentStatus::Processing);
        assert_eq!(map_charge_status("CONCLUIDA"), PaymentIntentStatus::Succeeded);
        assert_eq!(
            map_charge_status("REMOVIDA_PELO_USUARIO_RECEBEDOR"),
            PaymentIntentStatus::Cancelled
        );
        assert_eq!(map_charge_status("REMOVIDA_PELO_PSP"), PaymentIntentStatus::Cancelled);
        assert_eq!(map_charge_status("???"), PaymentIntentStatus::Processing);
    }

    #[test]
    fn test_payout_status_mapping() {
        assert_eq!(map_payout_status("EM_PROCESSAMENTO"), TransferStatus::Processing);
        assert_eq!(map_payout_status("REALIZADO"), TransferStatus::Completed);
        assert_eq!(map_payout_status("NAO_REALIZADO"), TransferStatus::Failed);
    }

    #[test]
    fn test_webhook_event_mapping() {
        assert_eq!(map_event_name("cob.paid"), WebhookEventType::PaymentIntentSucceeded);
        assert_eq!(map_event_name("payout.rejected"), WebhookEventType::PayoutFailed);
        assert_eq!(map_event_name("devolucao.completed"), WebhookEventType::RefundSucceeded);
        assert_eq!(map_event_name("dict.key.verified"), WebhookEventType::PaymentMethodVerified);
        assert_eq!(map_event_name("something.new"), WebhookEventType::Unknown);
    }

    #[test]
    fn test_webhook_signature_roundtrip() {
        let gateway = test_gateway();
        let payload = br#"{"event":"cob.paid","id":"evt_1"}"#;
        let sig = signature::sign_payload(payload, "whsec");
        assert!(gateway.verify_webhook_signature(payload, &sig));
        assert!(!gateway.verify_webhook_signature(payload, "deadbeef"));
        assert!(!gateway.verify_webhook_signature(payload, ""));
    }

    #[test]
    fn test_parse_webhook_event() {
        let gateway = test_gateway();
        let payload = br#"{"event":"cob.paid","id":"evt_42","timestamp":"2024-05-01T12:00:00Z"}"#;
        let event = gateway.parse_webhook_event(payload).unwrap();
        assert_eq!(event.event_type, WebhookEventType::PaymentIntentSucceeded);
        assert_eq!(event.delivery_id, "evt_42");
        assert_eq!(event.data["event"], "cob.paid");
    }

    #[test]
    fn test_parse_webhook_event_without_id_is_stable() {
        let gateway = test_gateway();
        let payload = br#"{"event":"payout.completed"}"#;
        let a = gateway.parse_webhook_event(payload).unwrap();
        let b = gateway.parse_webhook_event(payload).unwrap();
        assert_eq!(a.delivery_id, b.delivery_id);
        assert!(a.delivery_id.starts_with("evt_"));
        assert_eq!(a.event_type, WebhookEventType::PayoutPaid);
    }

    #[test]
    fn test_parse_webhook_rejects_non_json() {
        let gateway = test_gateway();
        assert!(gateway.parse_webhook_event(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_invalid_destination_fails_without_network() {
        let gateway = test_gateway();
        let result = gateway
            .initiate_transfer(TransferRequest {
                amount: Money::new(5000, Currency::BRL).unwrap(),
                destination: TransferDestination::instant_key("cpf:123"),
                idempotency_key: "tr-1".to_string(),
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(result.status, TransferStatus::Failed);
        assert_eq!(result.error_code.as_deref(), Some("invalid_destination"));
    }

    #[tokio::test]
    async fn test_non_brl_amount_is_rejected() {
        let gateway = test_gateway();
        let result = gateway
            .create_payment_intent(PaymentIntentRequest {
                amount: Money::new(5000, Currency::IDR).unwrap(),
                idempotency_key: "pi-1".to_string(),
                description: None,
                metadata: serde_json::Value::Null,
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancel_transfer_is_unsupported() {
        let gateway = test_gateway();
        let result = gateway.cancel_transfer("any").await;
        assert!(matches!(result, Err(GatewayError::Unsupported { .. })));
    }

    #[test]
    fn test_static_and_dynamic_codes() {
        let gateway = test_gateway();
        let static_code = gateway.create_static_qr_code(None, Some("Tips")).unwrap();
        assert!(crate::pix::brcode::verify_crc(&static_code));
        assert!(static_code.contains("62070503***"));

        let amount = Money::new(12345, Currency::BRL).unwrap();
        let dynamic = gateway
            .create_dynamic_qr_code(&amount, &derive_txid("order-1"))
            .unwrap();
        assert!(crate::pix::brcode::verify_crc(&dynamic));
        assert!(dynamic.contains("123.45"));
    }

    #[test]
    fn test_static_code_with_fixed_amount() {
        let gateway = test_gateway();
        let amount = Money::new(10000, Currency::BRL).unwrap();
        let payload = gateway
            .create_static_qr_code(Some(&amount), Some("Test payment"))
            .unwrap();
        assert!(crate::pix::brcode::verify_crc(&payload));
        assert!(payload.contains("5406100.00"));
        assert!(payload.contains("Test payment"));
        assert!(payload.contains("62070503***"));

        let idr = Money::new(10000, Currency::IDR).unwrap();
        assert!(gateway.create_static_qr_code(Some(&idr), None).is_err());
    }

    #[test]
    fn test_key_display_masking() {
        let key = PixKey::parse("email:joao.silva@example.com").unwrap();
        assert_eq!(key.display(), "jo***@example.com");
        let key = PixKey::parse("cpf:12345678901").unwrap();
        assert_eq!(key.display(), "••••8901");
    }
}
