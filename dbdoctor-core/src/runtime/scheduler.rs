//! Timers backed by tokio tasks.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::channel::Scheduler;
use crate::events::{ChannelInput, ChannelInputSender, TimerId};

/// Shortest interval accepted for repeating timers.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest interval accepted for repeating timers. Keeps `Instant`
/// arithmetic in the ticker from overflowing.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// [`Scheduler`] that spawns one task per timer and reports
/// `ChannelInput::TimerFired` on the input queue.
///
/// Cancelling aborts the task. Dropping the scheduler aborts every
/// outstanding timer.
pub struct TokioScheduler {
    inputs: ChannelInputSender,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(inputs: ChannelInputSender) -> Self {
        Self {
            inputs,
            timers: HashMap::new(),
        }
    }

    /// Number of timers that have not finished or been cancelled.
    pub fn active_timers(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }

    fn prune(&mut self) {
        self.timers.retain(|_, handle| !handle.is_finished());
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, id: TimerId, delay: Duration) {
        self.prune();
        let inputs = self.inputs.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inputs.send(ChannelInput::TimerFired(id)).await.is_err() {
                debug!(timer = %id, "Input queue closed, dropping timer");
            }
        });
        self.timers.insert(id, handle);
    }

    fn schedule_repeating(&mut self, id: TimerId, interval: Duration) {
        self.prune();
        let inputs = self.inputs.clone();
        let period = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if inputs.send(ChannelInput::TimerFired(id)).await.is_err() {
                    debug!(timer = %id, "Input queue closed, stopping repeating timer");
                    return;
                }
            }
        });
        self.timers.insert(id, handle);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel_input_channel;

    #[tokio::test(start_paused = true)]
    async fn test_once_fires_after_delay() {
        let (tx, mut rx) = channel_input_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let start = Instant::now();

        scheduler.schedule_once(TimerId(1), Duration::from_secs(4));

        assert_eq!(rx.recv().await, Some(ChannelInput::TimerFired(TimerId(1))));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = channel_input_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule_once(TimerId(1), Duration::from_secs(1));
        scheduler.cancel(TimerId(1));
        scheduler.cancel(TimerId(99));

        let result = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_ticks_until_cancelled() {
        let (tx, mut rx) = channel_input_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let start = Instant::now();

        scheduler.schedule_repeating(TimerId(7), Duration::from_secs(30));
        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(ChannelInput::TimerFired(TimerId(7))));
        }
        assert!(start.elapsed() >= Duration::from_secs(90));

        scheduler.cancel(TimerId(7));
        let result = tokio::time::timeout(Duration::from_secs(120), rx.recv()).await;
        assert!(result.is_err());
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_repeating_interval_is_clamped() {
        let (tx, mut rx) = channel_input_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule_repeating(TimerId(3), Duration::MAX);

        let result = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(result.is_err());
        assert_eq!(scheduler.active_timers(), 1);

        assert_eq!(rx.recv().await, Some(ChannelInput::TimerFired(TimerId(3))));
        assert_eq!(scheduler.active_timers(), 1);
    }
}
