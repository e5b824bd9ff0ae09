//! Xendit multi-rail adapter.

pub mod adapter;
pub mod client;

pub use adapter::{ChannelDestination, ChannelKind, XenditGateway};
