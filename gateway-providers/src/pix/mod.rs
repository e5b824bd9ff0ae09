//! PIX instant-payment adapter.

pub mod adapter;
pub mod brcode;
pub mod client;

pub use adapter::{PixGateway, PixKey};
pub use brcode::BrCode;
