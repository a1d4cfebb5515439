//! The per-tick pipeline (`LevelMonitor`).
//!
//! One tick: three pings → median → smoothing buffer → calibration →
//! alerts → snapshot. The monitor owns the filter, the settings mirror and
//! the store; nothing is shared.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use serde::Serialize;
use tank_traits::clock::Clock;
use tank_traits::{EchoSensor, NonVolatile};
use tracing::{debug, info, warn};

use crate::alerts::{AlertEvent, AlertState};
use crate::calibration::{Endpoint, VolumeMismatch, compute, record_endpoint};
use crate::config::SAMPLES_PER_TICK;
use crate::error::{LevelError, Report, Result};
use crate::filter::{SmoothingFilter, median_of_three};
use crate::ranging::{InvalidReason, Ranger, Reading};
use crate::settings::{Settings, SettingsUpdate, UpdateReport};
use crate::snapshot::MeasurementSnapshot;
use crate::store::{LoadReport, SettingsStore};
use crate::util::interval_duration;

pub type AlertHook = Box<dyn FnMut(&AlertEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TickStatus {
    /// A new snapshot was computed.
    Published,
    /// The median was invalid; the previous snapshot stands.
    NoValidSample,
    /// The smoothing buffer holds nothing yet; the previous snapshot stands.
    NoEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub status: TickStatus,
    pub samples: [Reading; SAMPLES_PER_TICK],
    pub median: Reading,
    pub alerts: Vec<AlertEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationOutcome {
    pub endpoint: Endpoint,
    pub distance_cm: f32,
    /// `full < empty` still holds after the change.
    pub ordered: bool,
}

pub struct LevelMonitor<S: EchoSensor, N: NonVolatile> {
    pub(crate) ranger: Ranger<S>,
    pub(crate) filter: SmoothingFilter,
    pub(crate) store: SettingsStore<N>,
    pub(crate) settings: Settings,
    pub(crate) alerts: AlertState,
    pub(crate) snapshot: MeasurementSnapshot,
    pub(crate) last_distance: Option<f32>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) inter_sample_delay: Duration,
    pub(crate) alert_hook: Option<AlertHook>,
    pub(crate) load_report: LoadReport,
    pub(crate) volume_mismatch: Option<VolumeMismatch>,
}

impl<S: EchoSensor, N: NonVolatile> core::fmt::Debug for LevelMonitor<S, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LevelMonitor")
            .field("settings", &self.settings)
            .field("snapshot", &self.snapshot)
            .field("window", &self.filter.window())
            .finish()
    }
}

impl<S: EchoSensor, N: NonVolatile> LevelMonitor<S, N> {
    /// Run one measurement cycle.
    pub fn tick(&mut self) -> TickReport {
        let samples = self.sample();
        let median = median_of_three(samples);

        self.snapshot.tick = self.snapshot.tick.wrapping_add(1);
        self.snapshot.raw_valid = median.is_valid();
        self.snapshot.raw_distance_cm = median.cm();

        let accepted = median.cm().is_some_and(|cm| self.filter.push(cm));
        let estimate = self.filter.estimate();

        let status = match (accepted, estimate) {
            (true, Some(distance)) => {
                let alerts = self.publish(distance);
                return TickReport {
                    status: TickStatus::Published,
                    samples,
                    median,
                    alerts,
                };
            }
            (_, None) => TickStatus::NoEstimate,
            (false, Some(_)) => TickStatus::NoValidSample,
        };
        debug!(tick = self.snapshot.tick, ?samples, ?status, "no new estimate");
        TickReport {
            status,
            samples,
            median,
            alerts: Vec::new(),
        }
    }

    fn sample(&mut self) -> [Reading; SAMPLES_PER_TICK] {
        let mut out = [Reading::Invalid(InvalidReason::NoEcho); SAMPLES_PER_TICK];
        for (i, slot) in out.iter_mut().enumerate() {
            if i > 0 {
                self.clock.sleep(self.inter_sample_delay);
            }
            *slot = self.ranger.measure_once();
        }
        out
    }

    fn publish(&mut self, distance_cm: f32) -> Vec<AlertEvent> {
        self.last_distance = Some(distance_cm);
        let reading = compute(
            distance_cm,
            &self.settings.calibration,
            &self.settings.geometry,
        );
        let events = self.alerts.evaluate(reading.percentage, &self.settings.alerts);

        let snap = &mut self.snapshot;
        snap.distance_cm = Some(distance_cm);
        snap.percentage = reading.percentage;
        snap.level_cm = reading.level_cm;
        snap.volume_l = reading.volume_l;
        snap.low_alert = self.alerts.low_active;
        snap.high_alert = self.alerts.high_active;
        debug!(
            tick = snap.tick,
            distance_cm,
            percentage = reading.percentage,
            level_cm = reading.level_cm,
            volume_l = reading.volume_l,
            "level published"
        );

        for event in &events {
            warn!(
                kind = %event.kind,
                percentage = event.percentage,
                threshold = event.threshold,
                "level alert"
            );
            if let Some(hook) = self.alert_hook.as_mut() {
                hook(event);
            }
        }
        events
    }

    /// Recompute the snapshot and alerts from the latest smoothed distance
    /// without taking a new measurement. No-op before the first estimate.
    pub fn recompute(&mut self) -> Vec<AlertEvent> {
        match self.last_distance {
            Some(d) => self.publish(d),
            None => Vec::new(),
        }
    }

    /// Record the latest smoothed distance as the empty or full endpoint,
    /// recompute the snapshot and save immediately.
    pub fn calibrate(&mut self, endpoint: Endpoint) -> Result<CalibrationOutcome> {
        let distance_cm = self.last_distance.ok_or_else(|| {
            Report::new(LevelError::State(
                "no smoothed distance yet; take a measurement before calibrating".into(),
            ))
        })?;
        let ordered = record_endpoint(&mut self.settings.calibration, endpoint, distance_cm);
        if ordered {
            info!(?endpoint, distance_cm, "calibration endpoint recorded");
        } else {
            warn!(
                ?endpoint,
                distance_cm,
                empty_cm = self.settings.calibration.empty_distance_cm,
                full_cm = self.settings.calibration.full_distance_cm,
                "calibration left endpoints mis-ordered; they will be reset on next load"
            );
        }
        // The mirror keeps the new endpoint even if the save fails, so the
        // snapshot must follow it either way.
        self.recompute();
        self.store
            .save(&self.settings)
            .wrap_err("saving calibration")?;
        Ok(CalibrationOutcome {
            endpoint,
            distance_cm,
            ordered,
        })
    }

    /// Apply an update batch: validate each field, resize the filter if the
    /// window changed, recompute, then save once if anything was accepted.
    /// A failed save leaves the accepted values in effect for this session.
    pub fn apply_update(&mut self, update: &SettingsUpdate) -> Result<UpdateReport> {
        let report = update.apply(&mut self.settings);
        for r in &report.rejected {
            warn!(key = %r.key, reason = %r.reason, "setting rejected");
        }
        if !report.changed() {
            return Ok(report);
        }

        let window = usize::from(self.settings.filter.smoothing_window);
        if self.filter.resize(window) {
            info!(window, "smoothing window resized, buffer cleared");
        }
        self.volume_mismatch = crate::calibration::cross_check_volume(&self.settings.geometry);

        self.recompute();

        self.store.save(&self.settings).wrap_err("saving settings")?;
        info!(accepted = ?report.accepted, "settings updated");
        Ok(report)
    }

    pub fn snapshot(&self) -> &MeasurementSnapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn volume_mismatch(&self) -> Option<VolumeMismatch> {
        self.volume_mismatch
    }

    /// Latest smoothed distance, if any tick has published one.
    pub fn last_distance(&self) -> Option<f32> {
        self.last_distance
    }

    pub fn filter(&self) -> &SmoothingFilter {
        &self.filter
    }

    pub fn alert_state(&self) -> AlertState {
        self.alerts
    }

    /// Time between ticks, from the settings.
    pub fn tick_interval(&self) -> Duration {
        interval_duration(self.settings.filter.measurement_interval_s)
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        self.ranger.sensor_mut()
    }
}
