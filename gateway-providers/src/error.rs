//! Client-level errors, internal to this crate.
//!
//! These never cross the adapter boundary: financial operations convert
//! them into failed-status results with canonical error codes, keeping
//! raw provider/transport detail in `error_message` only.

use gateway_types::error_code;

/// What went wrong talking to a PSP.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// Transport-level failure: DNS, TLS, timeout, connection reset.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a rejection.
    #[error("provider rejected request ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The provider answered with something we could not decode.
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderApiError {
    /// The stable, provider-agnostic code for this failure.
    pub fn canonical_code(&self) -> &'static str {
        match self {
            Self::Network(_) => error_code::NETWORK_ERROR,
            Self::Api { status, .. } if *status == 404 => error_code::NOT_FOUND,
            Self::Api { status, .. } if *status == 409 => error_code::DUPLICATE_REQUEST,
            Self::Api { .. } | Self::Decode(_) => error_code::PROVIDER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProviderApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_codes() {
        let err = ProviderApiError::Network("timeout".into());
        assert_eq!(err.canonical_code(), "network_error");

        let err = ProviderApiError::Api {
            status: 404,
            code: "NOT_FOUND".into(),
            message: "no such charge".into(),
        };
        assert_eq!(err.canonical_code(), "not_found");

        let err = ProviderApiError::Api {
            status: 400,
            code: "SOMETHING".into(),
            message: "bad".into(),
        };
        assert_eq!(err.canonical_code(), "provider_error");
    }
}
