//! Common time helpers for tank_core.

use std::time::Duration;

/// Longest single sleep while waiting for the next tick, so a shutdown
/// request is noticed promptly.
pub const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Tick period for a measurement interval in seconds.
/// Clamps `seconds` to at least 1 so a zero never spins the loop.
#[inline]
pub fn interval_duration(seconds: u16) -> Duration {
    Duration::from_secs(u64::from(seconds.max(1)))
}
