//! Public handle for a running alert channel.

use dbdoctor_sdk::config::ChannelConfig;
use dbdoctor_sdk::endpoint::ensure_socket_url;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use super::driver::ChannelDriver;
use super::scheduler::TokioScheduler;
use super::transport::WsTransport;
use crate::channel::{
    ChannelError, ChannelMachine, ChannelState, ChannelStatus, ListenerRegistry, Subscription,
};
use crate::events::{
    ChannelCommand, ChannelCommandSender, channel_command_channel, channel_input_channel,
};

/// Handle to a channel whose state lives in a background driver task.
///
/// Commands are queued to the driver and applied in order. Listeners are
/// registered directly and take effect for the next decoded event. Clones
/// share the same channel; the driver stops once every clone is dropped.
pub struct ChannelHandle<E> {
    command_tx: ChannelCommandSender,
    status_rx: watch::Receiver<ChannelStatus>,
    listeners: ListenerRegistry<E>,
}

impl<E> ChannelHandle<E>
where
    E: DeserializeOwned + Send + 'static,
{
    /// Create an idle channel and spawn its driver on the current runtime.
    ///
    /// The driver exits when `shutdown_rx` turns `true` (or its sender is
    /// dropped), or when every handle is dropped.
    pub fn spawn(
        config: &ChannelConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (input_tx, input_rx) = channel_input_channel();
        let (command_tx, command_rx) = channel_command_channel();
        let listeners = ListenerRegistry::new();

        let machine = ChannelMachine::new(
            config,
            WsTransport::new(input_tx.clone(), config.connect_timeout),
            TokioScheduler::new(input_tx),
            listeners.clone(),
        );
        let (status_tx, status_rx) = watch::channel(machine.status());

        let driver = ChannelDriver {
            machine,
            input_rx,
            command_rx,
            status_tx,
        };
        let task = tokio::spawn(driver.run(shutdown_rx));

        (
            Self {
                command_tx,
                status_rx,
                listeners,
            },
            task,
        )
    }
}

impl<E: 'static> ChannelHandle<E> {
    async fn command(&self, command: ChannelCommand) -> Result<(), ChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ChannelError::DriverStopped)
    }

    /// Tear down any current connection and connect to `url`.
    pub async fn connect(&self, url: Url) -> Result<(), ChannelError> {
        ensure_socket_url(&url)?;
        self.command(ChannelCommand::Connect(url)).await
    }

    /// Close the connection and stop reconnecting.
    pub async fn disconnect(&self) -> Result<(), ChannelError> {
        self.command(ChannelCommand::Disconnect).await
    }

    /// Send a text frame if the channel is open when the driver gets to it.
    /// Otherwise the frame is dropped.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.command(ChannelCommand::Send(text.into())).await
    }

    /// Register a listener for decoded events.
    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status_rx.borrow()
    }

    pub fn state(&self) -> ChannelState {
        self.status().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Open
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.status().reconnect_attempts
    }

    /// Receiver for status changes.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_rx.clone()
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ChannelStatus) -> bool,
    ) -> Result<ChannelStatus, ChannelError> {
        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(|status| predicate(status))
            .await
            .map_err(|_| ChannelError::DriverStopped)?;
        Ok(*status)
    }
}

impl<E> Clone for ChannelHandle<E> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            status_rx: self.status_rx.clone(),
            listeners: self.listeners.clone(),
        }
    }
}
