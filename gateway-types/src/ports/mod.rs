//! Port traits implemented by the provider and persistence adapters.

pub mod gateway;
pub mod ledger;

pub use gateway::PaymentGateway;
pub use ledger::LedgerRepository;
