//! Request authentication for inbound interaction webhooks.
pub mod signature;

pub use signature::*;
