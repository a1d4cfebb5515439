//! Drives the monitor at its measurement interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tank_traits::clock::Clock;
use tank_traits::{EchoSensor, NonVolatile};
use tracing::info;

use crate::pipeline::{LevelMonitor, TickReport};
use crate::snapshot::MeasurementSnapshot;
use crate::util::SHUTDOWN_POLL;

#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Stop after this many ticks; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    /// Wait out the measurement interval between ticks.
    pub paced: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_ticks: None,
            paced: true,
        }
    }
}

/// Tick until `max_ticks` is reached or `shutdown` is raised, handing each
/// report and the fresh snapshot to `on_tick`. Returns the number of ticks.
///
/// The interval is re-read after every tick, so a settings update takes
/// effect on the next wait.
pub fn run<S, N>(
    monitor: &mut LevelMonitor<S, N>,
    params: RunParams,
    shutdown: &AtomicBool,
    mut on_tick: impl FnMut(&TickReport, &MeasurementSnapshot),
) -> u64
where
    S: EchoSensor,
    N: NonVolatile,
{
    let clock = Arc::clone(monitor.clock());
    let mut done: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) || params.max_ticks.is_some_and(|m| done >= m) {
            break;
        }
        let started = clock.now();
        let report = monitor.tick();
        done += 1;
        on_tick(&report, monitor.snapshot());

        if params.paced && params.max_ticks.is_none_or(|m| done < m) {
            clock.sleep_until(started + monitor.tick_interval(), SHUTDOWN_POLL, shutdown);
        }
    }
    info!(ticks = done, "run loop finished");
    done
}
