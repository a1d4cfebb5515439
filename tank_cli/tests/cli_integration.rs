use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config for the simulated sensor; the settings image lives in
// the temp dir so every test starts from an erased medium.
fn write_valid_config(dir: &tempfile::TempDir, distance_cm: f32) -> PathBuf {
    let image = dir.path().join("eeprom.bin");
    let toml = format!(
        r#"
[sensor]
# pins are unused by the simulated sensor but must be present
trigger_pin = 23
echo_pin = 24
echo_timeout_ms = 30
inter_sample_delay_ms = 0

[storage]
path = '{}'
size = 512

[simulation]
distance_cm = {distance_cm}
"#,
        image.display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn tank(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("tank_cli").unwrap();
    cmd.arg("--log-level").arg("error").arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--ticks", "2", "--no-wait"], 0, "tick 2: 50.0%", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["show"], 0, "emptyDistance=95.00", "stdout")]
#[case(&["calibrate", "middle"], 2, "invalid value", "stderr")]
#[case(&["set"], 2, "required", "stderr")]
#[case(&["set", "tankHeight"], 1, "expected key=value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    let mut cmd = tank(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case(&["self-check"], "did not return an echo")]
#[case(&["calibrate", "empty", "--ticks", "2"], "cannot run yet")]
fn silent_sensor_is_reported(#[case] args: &[&str], #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    let mut cmd = tank(&cfg);
    cmd.env("TANK_TEST_SIM_NO_ECHO", "1");
    for a in args {
        cmd.arg(a);
    }
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn run_without_echo_keeps_going() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);
    tank(&cfg)
        .env("TANK_TEST_SIM_NO_ECHO", "1")
        .args(["run", "--ticks", "2", "--no-wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tick 2: no valid echo yet"));
}

#[test]
fn set_persists_across_invocations() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    tank(&cfg)
        .args(["set", "tankHeight=200", "alertLevelLow=15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tankHeight updated"))
        .stdout(predicate::str::contains("low_percent = 15"));

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings status: Valid"))
        .stdout(predicate::str::contains("tankHeight=200.00"))
        .stdout(predicate::str::contains("alertLevelLow=15"));

    // 50 % of the new 200 cm height
    tank(&cfg)
        .args(["run", "--ticks", "1", "--no-wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains("level 100.0 cm"));
}

#[test]
fn partially_rejected_set_saves_the_rest_and_exits_3() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    tank(&cfg)
        .args(["set", "tankVolume=-5", "readingSmoothing=10", "colour=blue"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("readingSmoothing updated"))
        .stderr(predicate::str::contains("2 setting(s) rejected"))
        .stderr(predicate::str::contains("colour: unknown setting"));

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("readingSmoothing=10"))
        .stdout(predicate::str::contains("tankVolume=200.0"));
}

#[test]
fn calibration_is_recorded_and_shown() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 120.0);

    tank(&cfg)
        .args(["calibrate", "empty", "--ticks", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("calibrated Empty at 120.00 cm"));

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("emptyDistance=120.00"));
}

#[test]
fn misordered_calibration_warns_about_the_repair() {
    let dir = tempdir().unwrap();
    // surface at 2 cm sits above the default full distance of 5
    let cfg = write_valid_config(&dir, 2.0);

    tank(&cfg)
        .args(["calibrate", "empty", "--ticks", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "full resets to its default, and empty too if still out of order",
        ));

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("fullDistance=5.00"))
        .stdout(predicate::str::contains("emptyDistance=95.00"));
}

#[test]
fn json_tick_lines_carry_the_snapshot() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    let out = tank(&cfg)
        .arg("--json")
        .args(["run", "--ticks", "1", "--no-wait"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"snapshot\""))
        .unwrap_or("")
        .to_string();
    assert!(!line.is_empty(), "no JSON tick line; stdout was: {stdout}");

    let v: serde_json::Value = serde_json::from_str(&line).expect("valid JSON");
    assert_eq!(v["status"], "Published");
    assert_eq!(v["snapshot"]["tick"], 1);
    assert_eq!(v["snapshot"]["percentage"].as_f64(), Some(50.0));
    assert_eq!(v["snapshot"]["raw_valid"], true);
    assert!(v["alerts"].as_array().is_some_and(Vec::is_empty));
}

#[test]
fn json_errors_name_the_reason() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);

    let out = tank(&cfg)
        .arg("--json")
        .arg("self-check")
        .env("TANK_TEST_SIM_NO_ECHO", "1")
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or("");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(v["reason"], "Timeout");
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}

#[test]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    tank(&missing)
        .arg("show")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[test]
fn invalid_config_names_the_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[sensor]\ntrigger_pin = 5\necho_pin = 5\n").unwrap();
    tank(&path)
        .arg("show")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "sensor.trigger_pin and sensor.echo_pin must differ",
        ));
}

#[test]
fn corrupted_image_falls_back_and_is_repaired() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, 50.0);
    tank(&cfg).arg("show").assert().success();

    // flip the high byte of the stored tank height
    let image_path = dir.path().join("eeprom.bin");
    let mut image = fs::read(&image_path).unwrap();
    image[5] ^= 0x80;
    fs::write(&image_path, image).unwrap();

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings status: Corrupted"))
        .stdout(predicate::str::contains("reset to defaults: tankHeight"))
        .stdout(predicate::str::contains("tankHeight=100.00"));

    tank(&cfg)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings status: Valid"));
}
