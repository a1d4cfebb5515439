//! Command implementations: hardware assembly, config mapping and output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use serde_json::json;
use tank_config::Config;
use tank_core::error::{LevelError, Report, Result};
#[cfg(feature = "hardware")]
use tank_core::hw_error::map_hw_error;
use tank_core::hw_error::map_storage_error;
use tank_core::{
    Endpoint, Field, MeasurementSnapshot, Monitor, RangingCfg, RunParams, Settings,
    SettingsUpdate, TickReport, TickStatus,
};
use tank_traits::{EchoSensor, NonVolatile};
use tracing::{info, warn};

use crate::error_fmt::RejectedSettings;

/// Set to any value to replace the simulated sensor with one that never
/// hears an echo.
#[cfg(not(feature = "hardware"))]
pub const SIM_NO_ECHO_ENV: &str = "TANK_TEST_SIM_NO_ECHO";

fn open_sensor(cfg: &Config) -> Result<Box<dyn EchoSensor>> {
    #[cfg(feature = "hardware")]
    {
        let sensor = tank_hardware::Hcsr04::new(cfg.sensor.trigger_pin, cfg.sensor.echo_pin)
            .map_err(|e| Report::new(map_hw_error(&e)))
            .wrap_err("open HC-SR04 pins")?;
        info!(
            trigger_pin = cfg.sensor.trigger_pin,
            echo_pin = cfg.sensor.echo_pin,
            "HC-SR04 ready"
        );
        Ok(Box::new(sensor))
    }
    #[cfg(not(feature = "hardware"))]
    {
        if std::env::var_os(SIM_NO_ECHO_ENV).is_some() {
            warn!("simulated sensor muted; every ping times out");
            return Ok(Box::new(tank_core::mocks::SilentSensor));
        }
        let sim = &cfg.simulation;
        let mut sensor = tank_hardware::SimulatedSensor::new(sim.distance_cm)
            .with_drift(sim.drift_cm_per_ping)
            .with_dropout_every(sim.dropout_every);
        if sim.noise_cm > 0.0 {
            sensor = sensor.with_noise(sim.noise_cm, sim.seed);
        }
        info!(distance_cm = sim.distance_cm, "using simulated sensor");
        Ok(Box::new(sensor))
    }
}

fn open_storage(cfg: &Config) -> Result<Box<dyn NonVolatile>> {
    let medium = tank_hardware::FileEeprom::open(&cfg.storage.path, cfg.storage.size)
        .map_err(|e| Report::new(map_storage_error(&e)))
        .wrap_err_with(|| format!("opening settings medium {}", cfg.storage.path))?;
    Ok(Box::new(medium))
}

/// Assemble a monitor from the host config; settings load as a side effect.
pub fn open_monitor(cfg: &Config) -> Result<Monitor> {
    let sensor = open_sensor(cfg)?;
    let storage = open_storage(cfg)?;
    let ranging: RangingCfg = (&cfg.sensor).into();
    Monitor::builder()
        .with_sensor(sensor)
        .with_storage(storage)
        .with_ranging(ranging)
        .try_build()
}

fn alert_line(report: &TickReport) -> impl Iterator<Item = String> + '_ {
    report.alerts.iter().map(|e| {
        format!(
            "ALERT {}: {:.1}% (threshold {}%)",
            e.kind, e.percentage, e.threshold
        )
    })
}

fn print_tick(json_mode: bool, report: &TickReport, snap: &MeasurementSnapshot) {
    if json_mode {
        println!(
            "{}",
            json!({
                "status": report.status,
                "snapshot": snap,
                "median": report.median,
                "alerts": report.alerts,
            })
        );
        return;
    }
    match report.status {
        TickStatus::Published => println!(
            "tick {}: {:.1}% level {:.1} cm volume {:.1} L (distance {:.1} cm)",
            snap.tick,
            snap.percentage,
            snap.level_cm,
            snap.volume_l,
            snap.distance_cm.unwrap_or_default()
        ),
        TickStatus::NoValidSample => println!(
            "tick {}: no valid echo, holding {:.1}%",
            snap.tick, snap.percentage
        ),
        TickStatus::NoEstimate => println!("tick {}: no valid echo yet", snap.tick),
    }
    for line in alert_line(report) {
        println!("{line}");
    }
}

pub fn run(cfg: &Config, json_mode: bool, ticks: Option<u64>, no_wait: bool) -> Result<()> {
    let mut monitor = open_monitor(cfg)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }
    info!(
        interval_s = monitor.settings().filter.measurement_interval_s,
        ticks = ?ticks,
        "monitor start"
    );
    let params = RunParams {
        max_ticks: ticks,
        paced: !no_wait,
    };
    let done = monitor.run(params, &shutdown, |report, snap| {
        print_tick(json_mode, report, snap);
    });
    if shutdown.load(Ordering::Relaxed) {
        info!(ticks = done, "stopped by signal");
    }
    Ok(())
}

fn settings_lines(s: &Settings) -> Vec<(Field, String)> {
    vec![
        (Field::TankHeight, format!("{:.2}", s.geometry.height_cm)),
        (Field::TankDiameter, format!("{:.2}", s.geometry.diameter_cm)),
        (Field::TankVolume, format!("{:.1}", s.geometry.volume_l)),
        (Field::SensorOffset, format!("{:.2}", s.geometry.sensor_offset_cm)),
        (
            Field::EmptyDistance,
            format!("{:.2}", s.calibration.empty_distance_cm),
        ),
        (
            Field::FullDistance,
            format!("{:.2}", s.calibration.full_distance_cm),
        ),
        (
            Field::MeasurementInterval,
            s.filter.measurement_interval_s.to_string(),
        ),
        (
            Field::ReadingSmoothing,
            s.filter.smoothing_window.to_string(),
        ),
        (Field::AlertLevelLow, s.alerts.low_percent.to_string()),
        (Field::AlertLevelHigh, s.alerts.high_percent.to_string()),
        (Field::AlertsEnabled, s.alerts.alerts_enabled.to_string()),
    ]
}

pub fn show(cfg: &Config, json_mode: bool) -> Result<()> {
    let monitor = open_monitor(cfg)?;
    let report = monitor.load_report();
    if json_mode {
        println!(
            "{}",
            json!({
                "load": report,
                "volume_mismatch": monitor.volume_mismatch().map(|m| json!({
                    "configured_l": m.configured_l,
                    "cylinder_l": m.cylinder_l,
                })),
            })
        );
        return Ok(());
    }
    println!("settings status: {:?}", report.status);
    if !report.replaced.is_empty() {
        let names: Vec<&str> = report.replaced.iter().map(|f| f.key()).collect();
        println!("reset to defaults: {}", names.join(", "));
    }
    for (field, value) in settings_lines(monitor.settings()) {
        println!("{}={value}", field.key());
    }
    if let Some(m) = monitor.volume_mismatch() {
        println!(
            "warning: tankVolume {:.1} L differs from the cylinder estimate {:.1} L",
            m.configured_l, m.cylinder_l
        );
    }
    Ok(())
}

/// Effective settings as TOML, printed after a successful `set`.
pub fn settings_toml(s: &Settings) -> Result<String> {
    toml::to_string_pretty(s).wrap_err("rendering settings as TOML")
}

pub fn calibrate(cfg: &Config, json_mode: bool, endpoint: Endpoint, ticks: u64) -> Result<()> {
    let mut monitor = open_monitor(cfg)?;
    let shutdown = AtomicBool::new(false);
    let params = RunParams {
        max_ticks: Some(ticks.max(1)),
        paced: false,
    };
    monitor.run(params, &shutdown, |_, _| {});
    let outcome = monitor.calibrate(endpoint)?;
    let cal = monitor.settings().calibration;
    if json_mode {
        println!(
            "{}",
            json!({
                "endpoint": outcome.endpoint,
                "distance_cm": outcome.distance_cm,
                "ordered": outcome.ordered,
                "calibration": cal,
            })
        );
    } else {
        println!(
            "calibrated {:?} at {:.2} cm (empty {:.2} cm, full {:.2} cm)",
            outcome.endpoint, outcome.distance_cm, cal.empty_distance_cm, cal.full_distance_cm
        );
        if !outcome.ordered {
            println!(
                "warning: full distance must be below empty distance; on next start full resets to its default, and empty too if still out of order"
            );
        }
    }
    Ok(())
}

/// Split `key=value` arguments. A missing `=` is a usage error for the
/// whole batch.
pub fn parse_pairs(args: &[String]) -> Result<Vec<(&str, &str)>> {
    args.iter()
        .map(|a| {
            a.split_once('=').ok_or_else(|| {
                Report::new(LevelError::Config(format!(
                    "expected key=value, got '{a}'"
                )))
            })
        })
        .collect()
}

pub fn set(cfg: &Config, json_mode: bool, args: &[String]) -> Result<()> {
    let pairs = parse_pairs(args)?;
    let update = SettingsUpdate::from_pairs(pairs);
    let mut monitor = open_monitor(cfg)?;
    let report = monitor.apply_update(&update)?;

    let rejected: Vec<String> = report
        .rejected
        .iter()
        .map(|r| format!("{}: {}", r.key, r.reason))
        .collect();
    if json_mode {
        println!(
            "{}",
            json!({ "accepted": report.accepted, "settings": monitor.settings() })
        );
    } else {
        for f in &report.accepted {
            println!("{f} updated");
        }
        if report.accepted.is_empty() {
            println!("nothing changed");
        } else {
            print!("{}", settings_toml(monitor.settings())?);
        }
    }
    if rejected.is_empty() {
        Ok(())
    } else {
        Err(Report::new(RejectedSettings(rejected)))
    }
}

pub fn self_check(cfg: &Config, json_mode: bool) -> Result<()> {
    let mut monitor = open_monitor(cfg)?;
    let report = monitor.tick();
    if !report.median.is_valid() {
        warn!(samples = ?report.samples, "self-check: no valid echo");
        return Err(Report::new(LevelError::Timeout)).wrap_err("self-check ping");
    }
    let status = &monitor.load_report().status;
    if json_mode {
        println!(
            "{}",
            json!({ "ok": true, "median": report.median, "settings_status": status })
        );
    } else {
        println!(
            "self-check ok: echo at {:.1} cm, settings {:?}",
            report.median.cm().unwrap_or_default(),
            status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_on_first_equals() {
        let args = vec!["tankHeight=120".to_string(), "x=a=b".to_string()];
        let pairs = parse_pairs(&args).unwrap();
        assert_eq!(pairs, vec![("tankHeight", "120"), ("x", "a=b")]);
    }

    #[test]
    fn pair_without_equals_is_rejected() {
        let args = vec!["tankHeight".to_string()];
        let err = parse_pairs(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LevelError>(),
            Some(LevelError::Config(_))
        ));
    }

    #[test]
    fn default_settings_render_as_toml() {
        let text = settings_toml(&Settings::default()).unwrap();
        assert!(text.contains("[geometry]"));
        assert!(text.contains("height_cm = 100.0"));
        assert!(text.contains("alerts_enabled = true"));
    }
}
