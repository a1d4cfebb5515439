use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the `is_high` predicate reports `level`, or `deadline` passes.
///
/// A zero `poll_interval` busy-waits, which is what microsecond pulse timing
/// needs; anything else sleeps between polls.
pub fn wait_until_level(
    mut is_high: impl FnMut() -> bool,
    level: bool,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<()> {
    while is_high() != level {
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(())
}

/// Time one high pulse on an input line, like Arduino's `pulseIn(pin, HIGH)`.
///
/// `timeout` bounds the whole measurement: waiting for the rising edge plus
/// the pulse itself. A pulse that is still high at the deadline counts as no
/// echo.
pub fn measure_pulse_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let deadline = Instant::now() + timeout;
    wait_until_level(&mut is_high, true, deadline, poll_interval)?;
    let rise = Instant::now();
    wait_until_level(&mut is_high, false, deadline, poll_interval)?;
    Ok(rise.elapsed())
}

/// Busy-wait for a short interval (trigger pulse shaping).
#[inline]
pub fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
