use std::time::Duration;

use dbdoctor_sdk::config::ReconnectPolicy;

/// Delay before the `attempt`-th consecutive reconnect (1-based).
///
/// Doubles from `base` and saturates at `cap`. Attempt 0 is treated as 1.
pub fn reconnect_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(cap, |delay| delay.min(cap))
}

/// [`reconnect_delay`] with the bounds taken from `policy`.
pub fn policy_delay(policy: &ReconnectPolicy, attempt: u32) -> Duration {
    reconnect_delay(attempt, policy.base_delay, policy.max_delay)
}
