//! Event plumbing for the alert channel.
//!
//! # Event Flow
//!
//! 1. `ChannelHandle` emits `ChannelCommand` -> `ChannelDriver`
//! 2. Socket tasks emit `ChannelInput::{Opened, Frame, Closed}` -> `ChannelDriver`
//! 3. Timer tasks emit `ChannelInput::TimerFired` -> `ChannelDriver`
//! 4. `ChannelDriver` feeds both into the `ChannelMachine`, which decodes
//!    frames and calls the registered listeners
//!
//! Inputs are tagged with connection or timer ids so that anything belonging
//! to a torn-down connection or a cancelled timer can be dropped.

pub mod channels;
pub mod types;

pub use channels::{
    COMMAND_CHANNEL_BUFFER, ChannelCommandReceiver, ChannelCommandSender, ChannelInputReceiver,
    ChannelInputSender, DEFAULT_CHANNEL_BUFFER, channel_command_channel, channel_input_channel,
};

pub use types::{ChannelCommand, ChannelInput, CloseReason, ConnectionId, TimerId};
