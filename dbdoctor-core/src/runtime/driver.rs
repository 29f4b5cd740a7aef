//! The task that owns a [`ChannelMachine`].

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::info;

use super::scheduler::TokioScheduler;
use super::transport::WsTransport;
use crate::channel::{ChannelMachine, ChannelStatus};
use crate::events::{ChannelCommand, ChannelCommandReceiver, ChannelInputReceiver};

/// Serializes commands and socket/timer inputs into one machine.
///
/// All state changes happen on this task, one input at a time. After every
/// step the machine's status is published on a watch channel.
pub struct ChannelDriver<E> {
    pub(super) machine: ChannelMachine<E, WsTransport, TokioScheduler>,
    pub(super) input_rx: ChannelInputReceiver,
    pub(super) command_rx: ChannelCommandReceiver,
    pub(super) status_tx: watch::Sender<ChannelStatus>,
}

impl<E> ChannelDriver<E>
where
    E: DeserializeOwned + Send + 'static,
{
    /// Run until shutdown is signaled or every handle has been dropped.
    ///
    /// On exit the machine is disconnected, which closes the socket and
    /// cancels all timers.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Alert channel driver started");

        if !*shutdown_rx.borrow_and_update() {
            loop {
                tokio::select! {
                    biased;

                    // Shutdown has highest priority. A dropped sender counts
                    // as shutdown.
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Alert channel driver received shutdown signal");
                            break;
                        }
                    }

                    command = self.command_rx.recv() => match command {
                        Some(command) => self.apply(command),
                        None => {
                            info!("All alert channel handles dropped");
                            break;
                        }
                    },

                    Some(input) = self.input_rx.recv() => {
                        self.machine.handle(input);
                    }
                }

                self.publish();
            }
        }

        self.machine.disconnect();
        self.publish();
        info!("Alert channel driver shutdown complete");
    }

    fn apply(&mut self, command: ChannelCommand) {
        match command {
            ChannelCommand::Connect(url) => self.machine.connect(url),
            ChannelCommand::Disconnect => self.machine.disconnect(),
            ChannelCommand::Send(text) => {
                self.machine.send(&text);
            }
        }
    }

    fn publish(&self) {
        let status = self.machine.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
