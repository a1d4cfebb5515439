//! Human-readable error descriptions and structured JSON error formatting.

use thiserror::Error;

/// Raised by `set` after saving whatever was accepted.
#[derive(Debug, Error)]
#[error("{} setting(s) rejected: {}", .0.len(), .0.join("; "))]
pub struct RejectedSettings(pub Vec<String>);

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use tank_core::error::{BuildError, LevelError};

    if let Some(rs) = err.downcast_ref::<RejectedSettings>() {
        return format!(
            "What happened: {rs}.\nLikely causes: Unknown key, unparsable value, or a value outside its allowed range.\nHow to fix: Check the key names (e.g. tankHeight, emptyDistance, alertLevelLow) and ranges, then resend only the rejected fields."
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No sensor was provided to the level monitor.\nLikely causes: The HC-SR04 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingStorage => {
                "What happened: No settings medium was provided to the level monitor.\nLikely causes: The EEPROM image could not be opened or was not wired into the builder.\nHow to fix: Ensure the medium is created successfully and passed via with_storage(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/tank_config.toml for a sample."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LevelError>() {
        return match le {
            LevelError::Timeout => "What happened: The sensor did not return an echo.\nLikely causes: Trigger/echo wiring, no 5V/GND, nothing within range, or echo timeout too low.\nHow to fix: Verify trigger_pin/echo_pin and power, aim the sensor at the liquid, and consider raising sensor.echo_timeout_ms.".to_string(),
            LevelError::HardwareFault(msg) => format!(
                "What happened: Failed to initialize hardware pins ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [sensor] pins in the config; ensure the process has permission to access GPIO."
            ),
            LevelError::Storage(msg) => format!(
                "What happened: The settings medium failed ({msg}).\nLikely causes: Unwritable storage.path, a full disk, or an image of the wrong size.\nHow to fix: Check [storage] in the config and the permissions of the image file; settings fall back to defaults until a save succeeds."
            ),
            LevelError::Config(msg) => format!(
                "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [sensor] pins or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            LevelError::State(msg) => format!(
                "What happened: The command cannot run yet ({msg}).\nLikely causes: No valid measurement has been taken, e.g. the sensor sees no echo.\nHow to fix: Check the sensor with `self-check`, then retry, optionally with more --ticks."
            ),
            LevelError::Hardware(msg) => format!(
                "What happened: Sensor error ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Rejected `set` fields exit with 3; every other error with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<RejectedSettings>().is_some() {
        return 3;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use tank_core::error::{BuildError, LevelError};

    if err.downcast_ref::<RejectedSettings>().is_some() {
        return "RejectedSettings";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<LevelError>() {
        Some(LevelError::Timeout) => "Timeout",
        Some(LevelError::Hardware(_) | LevelError::HardwareFault(_)) => "Hardware",
        Some(LevelError::Storage(_)) => "Storage",
        Some(LevelError::Config(_)) => "Config",
        Some(LevelError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(RejectedSettings(items)) = err.downcast_ref::<RejectedSettings>() {
        return json!({
            "reason": reason_name(err),
            "details": { "rejected": items },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tank_core::error::LevelError;

    #[test]
    fn state_error_names_the_fix() {
        let err = eyre::Report::new(LevelError::State("no smoothed distance yet".into()));
        let text = humanize(&err);
        assert!(text.starts_with("What happened: The command cannot run yet"));
        assert!(text.contains("self-check"));
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn rejected_settings_exit_with_three_and_list_fields() {
        let err = eyre::Report::new(RejectedSettings(vec!["tankVolume: must be > 0".into()]));
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "RejectedSettings");
        assert_eq!(v["details"]["rejected"][0], "tankVolume: must be > 0");
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        use eyre::WrapErr;
        let err = Err::<(), _>(LevelError::Storage("disk full".into()))
            .wrap_err("saving settings")
            .unwrap_err();
        assert!(humanize(&err).contains("settings medium failed"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Storage");
    }
}
