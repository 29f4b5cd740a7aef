//! Capabilities the state machine needs from its environment.
//!
//! Both traits are fire-and-forget: results come back later as
//! [`ChannelInput`](crate::events::ChannelInput)s tagged with the id passed
//! in. The tokio implementations live in [`crate::runtime`]; tests use
//! recording fakes.

use std::time::Duration;

use url::Url;

use crate::events::{ConnectionId, TimerId};

/// Opens, writes to and closes sockets.
pub trait Transport {
    /// Start connecting to `url`. Must eventually report `Opened(id)` or
    /// `Closed(id, _)`; after `Opened(id)` it must eventually report
    /// `Closed(id, _)` unless [`close`](Transport::close) is called first.
    fn open(&mut self, id: ConnectionId, url: &Url);

    /// Queue a text frame on an open connection. Unknown ids are ignored.
    fn send(&mut self, id: ConnectionId, text: &str);

    /// Close the connection. Unknown ids are ignored.
    fn close(&mut self, id: ConnectionId);
}

/// Schedules timers that report `TimerFired(id)`.
pub trait Scheduler {
    /// Fire once after `delay`.
    fn schedule_once(&mut self, id: TimerId, delay: Duration);

    /// Fire every `interval`, first after one full interval.
    fn schedule_repeating(&mut self, id: TimerId, interval: Duration);

    /// Stop the timer. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}
