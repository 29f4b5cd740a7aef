//! The reconnecting alert channel.
//!
//! - [`ChannelMachine`]: state machine deciding when to open, close, ping and
//!   back off. Has no I/O of its own.
//! - [`ListenerRegistry`]: ordered listener list with identity-based
//!   disposal.
//! - [`Transport`] / [`Scheduler`]: the capabilities the machine drives.
//!
//! The tokio-backed implementation is in [`crate::runtime`].

pub mod listeners;
pub mod machine;
pub mod ports;
pub mod state;

pub use listeners::{DispatchReport, Listener, ListenerId, ListenerRegistry, Subscription};
pub use machine::ChannelMachine;
pub use ports::{Scheduler, Transport};
pub use state::{ChannelState, ChannelStatus};

use dbdoctor_sdk::endpoint::EndpointError;
use thiserror::Error;

/// Errors returned by [`ChannelHandle`](crate::runtime::ChannelHandle).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The driver task has exited (shutdown or panic); commands can no
    /// longer be delivered.
    #[error("channel driver has stopped")]
    DriverStopped,

    /// The URL cannot be used for a WebSocket connection.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}
