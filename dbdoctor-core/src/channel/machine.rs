//! The reconnecting channel as a plain state machine.
//!
//! `ChannelMachine` owns no sockets and no clocks. It reacts to commands
//! (`connect`, `disconnect`, `send`) and to [`ChannelInput`]s, and drives a
//! [`Transport`] and a [`Scheduler`] in response. The tokio driver in
//! [`crate::runtime`] is one environment for it; the tests below are another.
//!
//! Invariants kept by every method:
//! - at most one connection id, one reconnect timer and one heartbeat timer
//!   are tracked at any time;
//! - handles are cleared before replacements are created, so an input that
//!   belongs to something already torn down never matches and is dropped.

use std::time::Duration;

use dbdoctor_sdk::config::{ChannelConfig, ReconnectPolicy};
use dbdoctor_sdk::objects::{HEARTBEAT_PING, is_heartbeat_ack};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use super::listeners::{ListenerRegistry, Subscription};
use super::ports::{Scheduler, Transport};
use super::state::{ChannelState, ChannelStatus};
use crate::events::{ChannelInput, CloseReason, ConnectionId, TimerId};
use crate::utils::backoff::policy_delay;

/// Longest frame excerpt written to the log when a frame cannot be decoded.
const FRAME_PREVIEW_CHARS: usize = 200;

pub struct ChannelMachine<E, T, S> {
    transport: T,
    scheduler: S,
    listeners: ListenerRegistry<E>,
    policy: ReconnectPolicy,
    heartbeat_interval: Duration,

    url: Option<Url>,
    state: ChannelState,
    connection: Option<ConnectionId>,
    reconnect_timer: Option<TimerId>,
    heartbeat_timer: Option<TimerId>,
    reconnect_attempts: u32,
    next_id: u64,
}

impl<E, T, S> ChannelMachine<E, T, S>
where
    E: DeserializeOwned + 'static,
    T: Transport,
    S: Scheduler,
{
    pub fn new(
        config: &ChannelConfig,
        transport: T,
        scheduler: S,
        listeners: ListenerRegistry<E>,
    ) -> Self {
        Self {
            transport,
            scheduler,
            listeners,
            policy: config.reconnect,
            heartbeat_interval: config.heartbeat_interval,
            url: None,
            state: ChannelState::Idle,
            connection: None,
            reconnect_timer: None,
            heartbeat_timer: None,
            reconnect_attempts: 0,
            next_id: 0,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            state: self.state,
            reconnect_attempts: self.reconnect_attempts,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ChannelState::Open
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// The last URL passed to [`connect`](Self::connect).
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn listeners(&self) -> &ListenerRegistry<E> {
        &self.listeners
    }

    /// Register a listener for decoded events.
    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Replace any current connection with a new one to `url`.
    ///
    /// The reconnect counter is left alone; only a successful open resets
    /// it.
    pub fn connect(&mut self, url: Url) {
        info!(%url, "Connecting alert channel");
        self.url = Some(url);
        self.teardown();
        self.open();
    }

    /// Stop everything and return to `Idle`. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.state == ChannelState::Idle && self.connection.is_none() {
            debug!("Alert channel already idle");
            return;
        }
        self.teardown();
        self.state = ChannelState::Idle;
        info!("Alert channel disconnected");
    }

    /// Write `text` if the channel is open. Returns `false` and drops the
    /// frame otherwise; nothing is buffered.
    pub fn send(&mut self, text: &str) -> bool {
        match (self.state, self.connection) {
            (ChannelState::Open, Some(id)) => {
                self.transport.send(id, text);
                true
            }
            _ => {
                debug!(state = %self.state, "Dropping outbound frame, channel not open");
                false
            }
        }
    }

    /// Apply one input from the transport or the scheduler.
    pub fn handle(&mut self, input: ChannelInput) {
        match input {
            ChannelInput::Opened(id) => self.on_opened(id),
            ChannelInput::Frame(id, text) => self.on_frame(id, &text),
            ChannelInput::Closed(id, reason) => self.on_closed(id, reason),
            ChannelInput::TimerFired(id) => self.on_timer(id),
        }
    }

    // -- Input handlers -----------------------------------------------------

    fn on_opened(&mut self, id: ConnectionId) {
        if self.connection != Some(id) {
            debug!(connection = %id, "Ignoring open of stale connection");
            return;
        }
        self.state = ChannelState::Open;
        self.reconnect_attempts = 0;
        info!(connection = %id, "Alert channel open");
        self.start_heartbeat();
    }

    fn on_frame(&mut self, id: ConnectionId, text: &str) {
        if self.connection != Some(id) {
            trace!(connection = %id, "Ignoring frame from stale connection");
            return;
        }
        if is_heartbeat_ack(text) {
            trace!(connection = %id, "Heartbeat acknowledged");
            return;
        }
        match serde_json::from_str::<E>(text) {
            Ok(event) => {
                let report = self.listeners.dispatch(&event);
                debug!(
                    connection = %id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Dispatched event"
                );
            }
            Err(e) => {
                warn!(
                    connection = %id,
                    error = %e,
                    frame = preview(text),
                    "Dropping undecodable frame"
                );
            }
        }
    }

    fn on_closed(&mut self, id: ConnectionId, reason: CloseReason) {
        if self.connection != Some(id) {
            debug!(connection = %id, %reason, "Ignoring close of stale connection");
            return;
        }
        self.connection = None;
        self.cancel_heartbeat();
        info!(connection = %id, %reason, "Alert channel connection closed");
        self.schedule_reconnect();
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.reconnect_timer == Some(id) {
            self.reconnect_timer = None;
            info!(attempt = self.reconnect_attempts, "Reconnecting alert channel");
            self.teardown();
            self.open();
        } else if self.heartbeat_timer == Some(id) {
            self.heartbeat();
        } else {
            trace!(timer = %id, "Ignoring stale timer");
        }
    }

    // -- Private helpers ----------------------------------------------------

    fn next_connection_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId(self.next_id)
    }

    fn next_timer_id(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    fn open(&mut self) {
        let id = self.next_connection_id();
        let Some(url) = self.url.as_ref() else {
            warn!("No URL to connect to, staying idle");
            self.state = ChannelState::Idle;
            return;
        };
        self.connection = Some(id);
        self.state = ChannelState::Connecting;
        debug!(connection = %id, %url, "Opening connection");
        self.transport.open(id, url);
    }

    /// Cancel both timers and close the socket, without touching `state`.
    fn teardown(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.cancel_heartbeat();
        if let Some(id) = self.connection.take() {
            debug!(connection = %id, "Closing connection");
            self.transport.close(id);
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_attempts >= self.policy.max_attempts {
            self.state = ChannelState::GivenUp;
            error!(
                attempts = self.reconnect_attempts,
                "Reconnect attempts exhausted, giving up until the next connect"
            );
            return;
        }

        self.reconnect_attempts += 1;
        let delay = policy_delay(&self.policy, self.reconnect_attempts);
        let timer = self.next_timer_id();
        self.scheduler.schedule_once(timer, delay);
        self.reconnect_timer = Some(timer);
        self.state = ChannelState::Reconnecting;
        info!(
            attempt = self.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduled alert channel reconnect"
        );
    }

    fn start_heartbeat(&mut self) {
        self.cancel_heartbeat();
        let timer = self.next_timer_id();
        self.scheduler.schedule_repeating(timer, self.heartbeat_interval);
        self.heartbeat_timer = Some(timer);
    }

    fn cancel_heartbeat(&mut self) {
        if let Some(timer) = self.heartbeat_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    fn heartbeat(&mut self) {
        match (self.state, self.connection) {
            (ChannelState::Open, Some(id)) => {
                trace!(connection = %id, "Sending heartbeat");
                self.transport.send(id, HEARTBEAT_PING);
            }
            _ => {
                debug!("Connection no longer open, stopping heartbeat");
                self.cancel_heartbeat();
            }
        }
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(FRAME_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
