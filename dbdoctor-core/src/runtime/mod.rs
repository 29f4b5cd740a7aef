//! tokio runtime for the alert channel.
//!
//! [`ChannelHandle::spawn`] wires a [`ChannelMachine`](crate::channel::ChannelMachine)
//! to a [`WsTransport`] and a [`TokioScheduler`] and runs it on a
//! [`ChannelDriver`] task.

mod driver;
mod handle;
mod scheduler;
mod transport;

pub use driver::ChannelDriver;
pub use handle::ChannelHandle;
pub use scheduler::TokioScheduler;
pub use transport::WsTransport;

use dbdoctor_sdk::objects::AlertMessage;

/// The channel as used for the `/ws/alerts` stream.
pub type AlertChannel = ChannelHandle<AlertMessage>;
