//! Provider configuration loading from environment.
//!
//! Provider selection is a closed enum: an unknown provider name fails
//! at configuration load, not at first request.

use std::env;
use std::str::FromStr;

/// The providers this build knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderId {
    Pix,
    Xendit,
}

impl FromStr for ProviderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pix" => Ok(Self::Pix),
            "xendit" => Ok(Self::Xendit),
            other => Err(anyhow::anyhow!("Unknown payment provider: {other}")),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pix => write!(f, "pix"),
            Self::Xendit => write!(f, "xendit"),
        }
    }
}

/// Configuration for the PIX adapter.
#[derive(Debug, Clone)]
pub struct PixConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// The receiving key charges are addressed to.
    pub receiving_key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub webhook_secret: String,
}

/// Configuration for the Xendit adapter.
#[derive(Debug, Clone)]
pub struct XenditConfig {
    pub base_url: String,
    pub api_key: String,
    pub callback_token: String,
}

/// Fully resolved provider configuration.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Pix(PixConfig),
    Xendit(XenditConfig),
}

impl ProviderConfig {
    /// Loads configuration from environment variables. `PAYMENT_PROVIDER`
    /// selects the adapter; everything else is provider-specific.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let provider: ProviderId = require("PAYMENT_PROVIDER")?.parse()?;
        match provider {
            ProviderId::Pix => Ok(Self::Pix(PixConfig {
                base_url: require("PIX_BASE_URL")?,
                client_id: require("PIX_CLIENT_ID")?,
                client_secret: require("PIX_CLIENT_SECRET")?,
                receiving_key: require("PIX_RECEIVING_KEY")?,
                merchant_name: require("PIX_MERCHANT_NAME")?,
                merchant_city: require("PIX_MERCHANT_CITY")?,
                webhook_secret: require("PIX_WEBHOOK_SECRET")?,
            })),
            ProviderId::Xendit => Ok(Self::Xendit(XenditConfig {
                base_url: env::var("XENDIT_BASE_URL")
                    .unwrap_or_else(|_| "https://api.xendit.co".to_string()),
                api_key: require("XENDIT_API_KEY")?,
                callback_token: require("XENDIT_CALLBACK_TOKEN")?,
            })),
        }
    }

    pub fn provider_id(&self) -> ProviderId {
        match self {
            Self::Pix(_) => ProviderId::Pix,
            Self::Xendit(_) => ProviderId::Xendit,
        }
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parsing() {
        assert_eq!("pix".parse::<ProviderId>().unwrap(), ProviderId::Pix);
        assert_eq!("XENDIT".parse::<ProviderId>().unwrap(), ProviderId::Xendit);
        assert!("stripe".parse::<ProviderId>().is_err());
    }
}
