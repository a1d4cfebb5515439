//! Type-state builder for `Monitor` and generic `build_monitor` constructor.
//!
//! The builder enforces at compile time that a sensor and a storage medium
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use tank_traits::clock::{Clock, MonotonicClock};
use tank_traits::{EchoSensor, NonVolatile};
use tracing::{info, warn};

use crate::alerts::{AlertEvent, AlertState};
use crate::calibration::{Endpoint, VolumeMismatch, cross_check_volume};
use crate::config::RangingCfg;
use crate::error::{BuildError, Report, Result};
use crate::filter::SmoothingFilter;
use crate::pipeline::{AlertHook, CalibrationOutcome, LevelMonitor, TickReport};
use crate::ranging::Ranger;
use crate::runner::{RunParams, run};
use crate::settings::{Settings, SettingsUpdate, UpdateReport};
use crate::snapshot::MeasurementSnapshot;
use crate::store::{LoadReport, SettingsStore};

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Boxed monitor for callers that pick the sensor and medium at runtime.
pub struct Monitor {
    pub(crate) inner: LevelMonitor<Box<dyn EchoSensor>, Box<dyn NonVolatile>>,
}

impl core::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Monitor")
            .field("percentage", &self.inner.snapshot.percentage)
            .field("distance_cm", &self.inner.last_distance)
            .field("ticks", &self.inner.snapshot.tick)
            .finish()
    }
}

impl Monitor {
    /// Start building a Monitor.
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }

    pub fn tick(&mut self) -> TickReport {
        self.inner.tick()
    }

    pub fn recompute(&mut self) -> Vec<AlertEvent> {
        self.inner.recompute()
    }

    pub fn calibrate(&mut self, endpoint: Endpoint) -> Result<CalibrationOutcome> {
        self.inner.calibrate(endpoint)
    }

    pub fn apply_update(&mut self, update: &SettingsUpdate) -> Result<UpdateReport> {
        self.inner.apply_update(update)
    }

    pub fn snapshot(&self) -> &MeasurementSnapshot {
        self.inner.snapshot()
    }

    pub fn settings(&self) -> &Settings {
        self.inner.settings()
    }

    pub fn load_report(&self) -> &LoadReport {
        self.inner.load_report()
    }

    pub fn volume_mismatch(&self) -> Option<VolumeMismatch> {
        self.inner.volume_mismatch()
    }

    pub fn last_distance(&self) -> Option<f32> {
        self.inner.last_distance()
    }

    pub fn alert_state(&self) -> AlertState {
        self.inner.alert_state()
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        self.inner.tick_interval()
    }

    /// Drive ticks at the measurement interval; see [`crate::runner::run`].
    pub fn run(
        &mut self,
        params: RunParams,
        shutdown: &std::sync::atomic::AtomicBool,
        on_tick: impl FnMut(&TickReport, &MeasurementSnapshot),
    ) -> u64 {
        run(&mut self.inner, params, shutdown, on_tick)
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Monitor`.
pub struct MonitorBuilder<S, N> {
    sensor: Option<Box<dyn EchoSensor>>,
    storage: Option<Box<dyn NonVolatile>>,
    ranging: Option<RangingCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    alert_hook: Option<AlertHook>,
    _s: PhantomData<S>,
    _n: PhantomData<N>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            storage: None,
            ranging: None,
            clock: None,
            alert_hook: None,
            _s: PhantomData,
            _n: PhantomData,
        }
    }
}

/// Validate configuration, load settings and construct a `LevelMonitor`.
///
/// Shared by `MonitorBuilder::try_build()` and `build_monitor()`.
fn validate_and_build<S: EchoSensor, N: NonVolatile>(
    sensor: S,
    storage: N,
    ranging: RangingCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    alert_hook: Option<AlertHook>,
) -> Result<LevelMonitor<S, N>> {
    if ranging.echo_timeout_ms == 0 {
        return Err(Report::new(BuildError::InvalidConfig(
            "echo_timeout_ms must be >= 1",
        )));
    }

    let mut store = SettingsStore::new(storage)?;
    let load_report = store.load();
    let settings = load_report.settings;

    let volume_mismatch = cross_check_volume(&settings.geometry);
    if let Some(m) = volume_mismatch {
        warn!(
            configured_l = m.configured_l,
            cylinder_l = m.cylinder_l,
            "configured tank volume differs from cylinder estimate by more than 20%"
        );
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    info!(
        status = ?load_report.status,
        window = settings.filter.smoothing_window,
        interval_s = settings.filter.measurement_interval_s,
        "level monitor ready"
    );

    Ok(LevelMonitor {
        ranger: Ranger::new(sensor, &ranging),
        filter: SmoothingFilter::new(usize::from(settings.filter.smoothing_window)),
        store,
        settings,
        alerts: AlertState::default(),
        snapshot: MeasurementSnapshot::default(),
        last_distance: None,
        clock,
        inter_sample_delay: ranging.inter_sample_delay(),
        alert_hook,
        load_report,
        volume_mismatch,
    })
}

impl<S, N> MonitorBuilder<S, N> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Monitor> {
        let sensor = self
            .sensor
            .ok_or_else(|| Report::new(BuildError::MissingSensor))?;
        let storage = self
            .storage
            .ok_or_else(|| Report::new(BuildError::MissingStorage))?;
        let inner = validate_and_build(
            sensor,
            storage,
            self.ranging.unwrap_or_default(),
            self.clock,
            self.alert_hook,
        )?;
        Ok(Monitor { inner })
    }

    pub fn with_ranging(mut self, ranging: RangingCfg) -> Self {
        self.ranging = Some(ranging);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Called for every alert event, after it is logged.
    pub fn with_alert_hook<F>(mut self, f: F) -> Self
    where
        F: FnMut(&AlertEvent) + 'static,
    {
        self.alert_hook = Some(Box::new(f));
        self
    }
}

impl<N> MonitorBuilder<Missing, N> {
    pub fn with_sensor(self, sensor: impl EchoSensor + 'static) -> MonitorBuilder<Set, N> {
        MonitorBuilder {
            sensor: Some(Box::new(sensor)),
            storage: self.storage,
            ranging: self.ranging,
            clock: self.clock,
            alert_hook: self.alert_hook,
            _s: PhantomData,
            _n: PhantomData,
        }
    }
}

impl<S> MonitorBuilder<S, Missing> {
    pub fn with_storage(self, storage: impl NonVolatile + 'static) -> MonitorBuilder<S, Set> {
        MonitorBuilder {
            sensor: self.sensor,
            storage: Some(Box::new(storage)),
            ranging: self.ranging,
            clock: self.clock,
            alert_hook: self.alert_hook,
            _s: PhantomData,
            _n: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Only available once both sensor and storage are set.
    pub fn build(self) -> Result<Monitor> {
        self.try_build()
    }
}

/// Build a statically-dispatched `LevelMonitor` from concrete parts.
pub fn build_monitor<S, N>(
    sensor: S,
    storage: N,
    ranging: RangingCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    alert_hook: Option<AlertHook>,
) -> Result<LevelMonitor<S, N>>
where
    S: EchoSensor,
    N: NonVolatile,
{
    validate_and_build(sensor, storage, ranging, clock, alert_hook)
}
