//! Inbound updates and outbound replies, independent of any messenger SDK.

pub mod port;
pub mod throttled;
pub mod types;
