#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Tank level measurement pipeline (hardware-agnostic).
//!
//! All hardware goes through `tank_traits::EchoSensor` and
//! `tank_traits::NonVolatile`.
//!
//! ## Architecture
//!
//! - **Ranging**: one ping, validity window, no retries (`ranging`)
//! - **Smoothing**: median of three, then a resizable moving average (`filter`)
//! - **Calibration**: empty/full endpoints to percentage, level, volume (`calibration`)
//! - **Settings**: tunables, validation and update batches (`settings`), persisted
//!   with a versioned checksummed layout (`store`)
//! - **Alerts**: edge-triggered low/high latches (`alerts`)
//! - **Pipeline**: one tick end to end (`LevelMonitor`), boxed `Monitor`, runner
//!
//! Single-threaded by construction: the monitor owns every piece of mutable
//! state and a tick runs to completion.

pub mod alerts;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod fixed_point;
pub mod hw_error;
pub mod mocks;
pub mod pipeline;
pub mod ranging;
pub mod runner;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod util;

pub use alerts::{AlertEvent, AlertKind, AlertState};
pub use builder::{Missing, Monitor, MonitorBuilder, Set, build_monitor};
pub use calibration::{Endpoint, LevelReading, VolumeMismatch};
pub use config::RangingCfg;
pub use error::{BuildError, LevelError, Result};
pub use pipeline::{CalibrationOutcome, LevelMonitor, TickReport, TickStatus};
pub use ranging::{InvalidReason, Reading};
pub use runner::RunParams;
pub use settings::{
    AlertThresholds, CalibrationEndpoints, Field, FilterConfig, Settings, SettingsUpdate,
    TankGeometry, UpdateReport,
};
pub use snapshot::MeasurementSnapshot;
pub use store::{LoadReport, LoadStatus, SettingsStore};
