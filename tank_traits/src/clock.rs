use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Time source for tick pacing and the pauses between pings.
///
/// Only `now` and `sleep` need implementing. A test clock can make `sleep`
/// advance `now` instantly, which keeps paced loops deterministic.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Sleep until `deadline` in chunks of at most `slice`, returning early
    /// once `cancel` is raised. Returns `true` if the deadline was reached.
    fn sleep_until(&self, deadline: Instant, slice: Duration, cancel: &AtomicBool) -> bool {
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            let now = self.now();
            if now >= deadline {
                return true;
            }
            self.sleep((deadline - now).min(slice.max(Duration::from_millis(1))));
        }
    }
}

/// Wall-clock time from `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Clock whose sleeps only move an offset and are counted.
    struct StepClock {
        origin: Instant,
        offset: Cell<Duration>,
        sleeps: Cell<u32>,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }
        fn sleep(&self, d: Duration) {
            self.offset.set(self.offset.get() + d);
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }

    #[test]
    fn sleep_until_walks_to_the_deadline_in_slices() {
        let clock = StepClock::new();
        let deadline = clock.now() + Duration::from_millis(250);
        let cancel = AtomicBool::new(false);
        assert!(clock.sleep_until(deadline, Duration::from_millis(100), &cancel));
        assert_eq!(clock.now(), deadline);
        assert_eq!(clock.sleeps.get(), 3);
    }

    #[test]
    fn sleep_until_returns_early_when_cancelled() {
        let clock = StepClock::new();
        let cancel = AtomicBool::new(true);
        let deadline = clock.now() + Duration::from_secs(60);
        assert!(!clock.sleep_until(deadline, Duration::from_millis(100), &cancel));
        assert_eq!(clock.sleeps.get(), 0);
    }

    #[test]
    fn past_deadline_does_not_sleep() {
        let clock = MonotonicClock::new();
        let cancel = AtomicBool::new(false);
        let wall = Instant::now();
        assert!(clock.sleep_until(clock.now(), Duration::from_secs(1), &cancel));
        assert!(wall.elapsed() < Duration::from_millis(500));
    }
}
