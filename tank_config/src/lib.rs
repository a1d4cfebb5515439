#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Host-side configuration for the tank monitor.
//!
//! This covers what the device needs before it can read its own settings:
//! GPIO wiring, ranging timeouts, where the settings medium lives, logging,
//! and the simulated sensor used on a bench. Tank geometry, calibration and
//! alert thresholds are not here; they live in the persisted settings store.
use serde::Deserialize;

/// Largest EEPROM emulation the ESP-class parts offer.
pub const MAX_STORAGE_BYTES: usize = 4096;

#[derive(Debug, Deserialize)]
pub struct SensorCfg {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Give up on an echo after this long (ms). 30 ms covers ~5 m round trip.
    #[serde(default = "default_echo_timeout_ms")]
    pub echo_timeout_ms: u64,
    /// Pause between the three pings of one tick (ms).
    #[serde(default = "default_inter_sample_delay_ms")]
    pub inter_sample_delay_ms: u64,
}

fn default_echo_timeout_ms() -> u64 {
    30
}

fn default_inter_sample_delay_ms() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// File holding the emulated EEPROM image.
    pub path: String,
    /// Medium size in bytes.
    pub size: usize,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: "var/tank_eeprom.bin".to_string(),
            size: 512,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Simulated sensor used when the binary is built without `hardware`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Surface distance seen by the first ping (cm).
    pub distance_cm: f32,
    /// Uniform noise amplitude (cm).
    pub noise_cm: f32,
    /// Surface movement per ping (cm); positive drains the tank.
    pub drift_cm_per_ping: f32,
    /// Drop every Nth echo; 0 disables.
    pub dropout_every: u32,
    pub seed: u64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            distance_cm: 50.0,
            noise_cm: 0.0,
            drift_cm_per_ping: 0.0,
            dropout_every: 0,
            seed: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sensor: SensorCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.trigger_pin == self.sensor.echo_pin {
            eyre::bail!("sensor.trigger_pin and sensor.echo_pin must differ");
        }
        if self.sensor.echo_timeout_ms == 0 {
            eyre::bail!("sensor.echo_timeout_ms must be >= 1");
        }
        if self.sensor.echo_timeout_ms > 1000 {
            eyre::bail!("sensor.echo_timeout_ms is unreasonably large (>1s)");
        }
        if self.sensor.inter_sample_delay_ms > 1000 {
            eyre::bail!("sensor.inter_sample_delay_ms must be <= 1000");
        }

        // Storage
        if self.storage.path.trim().is_empty() {
            eyre::bail!("storage.path must not be empty");
        }
        if self.storage.size == 0 || self.storage.size > MAX_STORAGE_BYTES {
            eyre::bail!("storage.size must be in [1, {MAX_STORAGE_BYTES}]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Simulation
        let sim = &self.simulation;
        if !sim.distance_cm.is_finite() || sim.distance_cm < 0.0 {
            eyre::bail!("simulation.distance_cm must be finite and >= 0");
        }
        if !sim.noise_cm.is_finite() || sim.noise_cm < 0.0 {
            eyre::bail!("simulation.noise_cm must be finite and >= 0");
        }
        if !sim.drift_cm_per_ping.is_finite() {
            eyre::bail!("simulation.drift_cm_per_ping must be finite");
        }

        Ok(())
    }
}
