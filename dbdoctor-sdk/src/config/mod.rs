//! Tuning for the reconnecting alert channel.
//!
//! These types hold already-validated values. Reading them from a file is the
//! job of the embedding application.

mod channel;
mod reconnect;

pub use channel::ChannelConfig;
pub use reconnect::ReconnectPolicy;
