//! Xendit API client: authenticated wire calls and raw response shapes.
//!
//! Auth is HTTP basic with the secret key as username and an empty
//! password. Amounts on this wire are decimal major units as JSON
//! numbers. Write endpoints carry the caller's idempotency key in the
//! `X-IDEMPOTENCY-KEY` header.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::config::XenditConfig;
use crate::error::ProviderApiError;

const IDEMPOTENCY_HEADER: &str = "X-IDEMPOTENCY-KEY";

pub struct XenditApiClient {
    http: reqwest::Client,
    config: XenditConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateInvoice<'a> {
    external_id: &'a str,
    amount: f64,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// An invoice (incoming payment) as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawInvoice {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub invoice_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateDisbursement<'a> {
    external_id: &'a str,
    amount: f64,
    bank_code: &'a str,
    account_holder_name: &'a str,
    account_number: &'a str,
}

/// A disbursement (outgoing transfer) as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawDisbursement {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub failure_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRefund<'a> {
    invoice_id: &'a str,
    amount: f64,
}

/// A refund as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawRefund {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub failure_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateName<'a> {
    bank_code: &'a str,
    account_number: &'a str,
}

/// A bank-account name validation result.
#[derive(Debug, Deserialize)]
pub struct RawNameValidation {
    pub status: String,
    #[serde(default)]
    pub bank_account_holder_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl XenditApiClient {
    pub fn new(config: XenditConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &XenditConfig {
        &self.config
    }

    pub async fn create_invoice(
        &self,
        external_id: &str,
        amount: f64,
        currency: &str,
        description: Option<&str>,
    ) -> Result<RawInvoice, ProviderApiError> {
        self.send(
            self.http
                .post(format!("{}/v2/invoices", self.config.base_url))
                .basic_auth(&self.config.api_key, Some(""))
                .header(IDEMPOTENCY_HEADER, external_id)
                .json(&CreateInvoice {
                    external_id,
                    amount,
                    currency,
                    description,
                }),
        )
        .await
    }

    pub async fn get_invoice(&self, id: &str) -> Result<RawInvoice, ProviderApiError> {
        self.send(
            self.http
                .get(format!("{}/v2/invoices/{id}", self.config.base_url))
                .basic_auth(&self.config.api_key, Some("")),
        )
        .await
    }

    pub async fn expire_invoice(&self, id: &str) -> Result<RawInvoice, ProviderApiError> {
        self.send(
            self.http
                .post(format!("{}/invoices/{id}/expire!", self.config.base_url))
                .basic_auth(&self.config.api_key, Some("")),
        )
        .await
    }

    pub async fn create_disbursement(
        &self,
        external_id: &str,
        amount: f64,
        bank_code: &str,
        account_holder_name: &str,
        account_number: &str,
    ) -> Result<RawDisbursement, ProviderApiError> {
        self.send(
            self.http
                .post(format!("{}/disbursements", self.config.base_url))
                .basic_auth(&self.config.api_key, Some(""))
                .header(IDEMPOTENCY_HEADER, external_id)
                .json(&CreateDisbursement {
                    external_id,
                    amount,
                    bank_code,
                    account_holder_name,
                    account_number,
                }),
        )
        .await
    }

    pub async fn get_disbursement(&self, id: &str) -> Result<RawDisbursement, ProviderApiError> {
        self.send(
            self.http
                .get(format!("{}/disbursements/{id}", self.config.base_url))
                .basic_auth(&self.config.api_key, Some("")),
        )
        .await
    }

    pub async fn create_refund(
        &self,
        idempotency_key: &str,
        invoice_id: &str,
        amount: f64,
    ) -> Result<RawRefund, ProviderApiError> {
        self.send(
            self.http
                .post(format!("{}/refunds", self.config.base_url))
                .basic_auth(&self.config.api_key, Some(""))
                .header(IDEMPOTENCY_HEADER, idempotency_key)
                .json(&CreateRefund { invoice_id, amount }),
        )
        .await
    }

    /// Live holder-name check against the bank's records.
    pub async fn validate_name(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<RawNameValidation, ProviderApiError> {
        self.send(
            self.http
                .post(format!("{}/name_validator", self.config.base_url))
                .basic_auth(&self.config.api_key, Some(""))
                .json(&ValidateName {
                    bank_code,
                    account_number,
                }),
        )
        .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ProviderApiError::Decode(e.to_string()))
        } else {
            let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                error_code: None,
                message: None,
            });
            Err(ProviderApiError::Api {
                status: status.as_u16(),
                code: body.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: body
                    .message
                    .unwrap_or_else(|| "no message provided".to_string()),
            })
        }
    }
}
