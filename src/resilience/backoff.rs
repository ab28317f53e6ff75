//! Bounded exponential backoff.

use std::time::Duration;

/// Delay for the first attempt.
pub const BACKOFF_MIN: Duration = Duration::from_millis(100);

/// Upper bound for any attempt.
pub const BACKOFF_MAX: Duration = Duration::from_secs(10);

const BACKOFF_FACTOR: u32 = 2;

/// Delay before retrying after `attempt` failures: `100ms * 2^attempt`,
/// clamped to `[100ms, 10s]`.
pub fn delay(attempt: u32) -> Duration {
    BACKOFF_FACTOR
        .checked_pow(attempt)
        .and_then(|factor| BACKOFF_MIN.checked_mul(factor))
        .map_or(BACKOFF_MAX, |delay| delay.clamp(BACKOFF_MIN, BACKOFF_MAX))
}
