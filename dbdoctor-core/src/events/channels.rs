//! Queue factories for the channel driver.

use super::types::{ChannelCommand, ChannelInput};
use tokio::sync::mpsc;

/// Default buffer size for the input queue.
///
/// Socket readers block on a full queue, which pushes back on the server
/// instead of growing memory.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Commands are few and small.
pub const COMMAND_CHANNEL_BUFFER: usize = 64;

/// Sender handle for ChannelInput events.
pub type ChannelInputSender = mpsc::Sender<ChannelInput>;
/// Receiver handle for ChannelInput events.
pub type ChannelInputReceiver = mpsc::Receiver<ChannelInput>;

/// Sender handle for ChannelCommand messages.
pub type ChannelCommandSender = mpsc::Sender<ChannelCommand>;
/// Receiver handle for ChannelCommand messages.
pub type ChannelCommandReceiver = mpsc::Receiver<ChannelCommand>;

/// Create a new ChannelInput queue.
///
/// The sender is cloned into every socket and timer task.
pub fn channel_input_channel() -> (ChannelInputSender, ChannelInputReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new ChannelCommand queue.
pub fn channel_command_channel() -> (ChannelCommandSender, ChannelCommandReceiver) {
    mpsc::channel(COMMAND_CHANNEL_BUFFER)
}
