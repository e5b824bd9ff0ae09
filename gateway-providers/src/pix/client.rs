//! PIX API client: authenticated wire calls and raw response shapes.
//!
//! This layer knows nothing about the canonical model; it speaks the
//! provider's dialect (decimal major-unit amounts, Portuguese field
//! names) and hands raw structs to the adapter.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::config::PixConfig;
use crate::error::ProviderApiError;
use crate::token_cache::{AccessTokenCache, CachedToken};

/// Default charge lifetime in seconds before the code expires.
const CHARGE_EXPIRY_SECS: u32 = 3600;

pub struct PixApiClient {
    http: reqwest::Client,
    config: PixConfig,
    token_cache: AccessTokenCache,
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct Calendario {
    expiracao: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Valor {
    /// Decimal major units, e.g. `"100.00"`.
    pub original: String,
}

#[derive(Debug, Serialize)]
struct CreateCharge<'a> {
    calendario: Calendario,
    valor: Valor,
    chave: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "solicitacaoPagador")]
    solicitacao_pagador: Option<&'a str>,
}

/// A charge (`cob`) as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawCharge {
    pub txid: String,
    pub status: String,
    pub valor: Valor,
    #[serde(rename = "pixCopiaECola")]
    pub copy_paste_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct PatchChargeStatus<'a> {
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct Favorecido<'a> {
    chave: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePayout<'a> {
    valor: &'a str,
    favorecido: Favorecido<'a>,
}

/// An outgoing payout as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawPayout {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub motivo: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRefund<'a> {
    valor: &'a str,
}

/// A refund (`devolucao`) as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawRefund {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub motivo: Option<String>,
}

/// A key directory entry from the DICT lookup.
#[derive(Debug, Deserialize)]
pub struct RawDictEntry {
    pub chave: String,
    #[serde(rename = "tipoChave")]
    pub key_type: String,
    #[serde(rename = "nomeCorrentista")]
    pub owner_name: String,
    #[serde(default)]
    pub participante: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl PixApiClient {
    pub fn new(config: PixConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token_cache: AccessTokenCache::new(),
        }
    }

    pub fn config(&self) -> &PixConfig {
        &self.config
    }

    /// Returns a fresh-enough OAuth access token, refreshing through the
    /// single-flight cache when needed.
    async fn access_token(&self) -> Result<String, ProviderApiError> {
        self.token_cache
            .get_or_refresh(|| async {
                let response: TokenResponse = self
                    .send(
                        self.http
                            .post(format!("{}/oauth/token", self.config.base_url))
                            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                            .form(&[("grant_type", "client_credentials")]),
                    )
                    .await?;
                Ok(CachedToken::new(response.access_token, response.expires_in))
            })
            .await
    }

    pub async fn create_charge(
        &self,
        txid: &str,
        amount: &str,
        description: Option<&str>,
    ) -> Result<RawCharge, ProviderApiError> {
        let token = self.access_token().await?;
        let body = CreateCharge {
            calendario: Calendario {
                expiracao: CHARGE_EXPIRY_SECS,
            },
            valor: Valor {
                original: amount.to_string(),
            },
            chave: &self.config.receiving_key,
            solicitacao_pagador: description,
        };
        self.send(
            self.http
                .put(format!("{}/v2/cob/{txid}", self.config.base_url))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    pub async fn get_charge(&self, txid: &str) -> Result<RawCharge, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .get(format!("{}/v2/cob/{txid}", self.config.base_url))
                .bearer_auth(token),
        )
        .await
    }

    pub async fn remove_charge(&self, txid: &str) -> Result<RawCharge, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .patch(format!("{}/v2/cob/{txid}", self.config.base_url))
                .bearer_auth(token)
                .json(&PatchChargeStatus {
                    status: "REMOVIDA_PELO_USUARIO_RECEBEDOR",
                }),
        )
        .await
    }

    pub async fn create_payout(
        &self,
        id: &str,
        amount: &str,
        key: &str,
    ) -> Result<RawPayout, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .put(format!("{}/v2/payouts/{id}", self.config.base_url))
                .bearer_auth(token)
                .json(&CreatePayout {
                    valor: amount,
                    favorecido: Favorecido { chave: key },
                }),
        )
        .await
    }

    pub async fn get_payout(&self, id: &str) -> Result<RawPayout, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .get(format!("{}/v2/payouts/{id}", self.config.base_url))
                .bearer_auth(token),
        )
        .await
    }

    pub async fn create_refund(
        &self,
        end_to_end_id: &str,
        refund_id: &str,
        amount: &str,
    ) -> Result<RawRefund, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .put(format!(
                    "{}/v2/pix/{end_to_end_id}/devolucao/{refund_id}",
                    self.config.base_url
                ))
                .bearer_auth(token)
                .json(&CreateRefund { valor: amount }),
        )
        .await
    }

    /// Live key directory lookup.
    pub async fn lookup_key(&self, key: &str) -> Result<RawDictEntry, ProviderApiError> {
        let token = self.access_token().await?;
        self.send(
            self.http
                .get(format!("{}/v2/dict/keys/{key}", self.config.base_url))
                .bearer_auth(token),
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
                title: None,
                detail: None,
            });
            Err(ProviderApiError::Api {
                status: status.as_u16(),
                code: body.title.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: body.detail.unwrap_or_else(|| "no detail provided".to_string()),
            })
        }
    }
}
