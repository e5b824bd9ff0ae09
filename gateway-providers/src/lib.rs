//! # Gateway Providers
//!
//! Provider adapters implementing the [`gateway_types::PaymentGateway`]
//! port. Each adapter translates between the canonical model and one
//! provider's wire dialect:
//!
//! - `pix/` - Brazilian instant-payment rail (charges, payouts,
//!   receive-code generation, key directory)
//! - `xendit/` - Southeast-Asian multi-rail processor (invoices,
//!   disbursements, bank and e-wallet channels)
//!
//! Shared plumbing (signature checks, masking, token caching, delivery
//! ids) lives at the crate root so both adapters stay thin.

use std::sync::Arc;

use gateway_types::PaymentGateway;

pub mod config;
pub mod delivery;
pub mod error;
pub mod mask;
pub mod pix;
pub mod signature;
pub mod token_cache;
pub mod xendit;

pub use config::{PixConfig, ProviderConfig, ProviderId, XenditConfig};
pub use pix::PixGateway;
pub use xendit::XenditGateway;

/// Builds the configured provider adapter behind the port trait.
///
/// Provider selection is closed: configuration loading already rejects
/// unknown provider names, so this cannot fail on an unknown variant.
pub fn build_gateway(config: ProviderConfig) -> Arc<dyn PaymentGateway> {
    match config {
        ProviderConfig::Pix(cfg) => Arc::new(PixGateway::new(cfg)),
        ProviderConfig::Xendit(cfg) => Arc::new(XenditGateway::new(cfg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_gateway_selects_adapter() {
        let gateway = build_gateway(ProviderConfig::Xendit(XenditConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "key".to_string(),
            callback_token: "token".to_string(),
        }));
        assert_eq!(gateway.name(), "xendit");

        let gateway = build_gateway(ProviderConfig::Pix(PixConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            receiving_key: "k".to_string(),
            merchant_name: "Loja".to_string(),
            merchant_city: "SP".to_string(),
            webhook_secret: "whsec".to_string(),
        }));
        assert_eq!(gateway.name(), "pix");
    }
}
