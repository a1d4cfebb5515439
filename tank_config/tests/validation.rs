use rstest::rstest;
use tank_config::load_toml;

const BASE: &str = r#"
[sensor]
trigger_pin = 5
echo_pin = 18
"#;

#[test]
fn minimal_config_takes_defaults() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.sensor.echo_timeout_ms, 30);
    assert_eq!(cfg.sensor.inter_sample_delay_ms, 10);
    assert_eq!(cfg.storage.size, 512);
    assert_eq!(cfg.simulation.dropout_every, 0);
    assert!(cfg.logging.file.is_none());
}

#[test]
fn missing_sensor_section_fails_to_parse() {
    assert!(load_toml("[storage]\nsize = 512\n").is_err());
}

#[rstest]
#[case("[sensor]\ntrigger_pin = 5\necho_pin = 5\n", "must differ")]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\necho_timeout_ms = 0\n",
    "echo_timeout_ms must be >= 1"
)]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\ninter_sample_delay_ms = 5000\n",
    "inter_sample_delay_ms must be <= 1000"
)]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\n[storage]\nsize = 0\n",
    "storage.size must be in"
)]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\n[storage]\npath = \" \"\n",
    "storage.path must not be empty"
)]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\n[logging]\nrotation = \"weekly\"\n",
    "logging.rotation"
)]
#[case(
    "[sensor]\ntrigger_pin = 5\necho_pin = 18\n[simulation]\nnoise_cm = -1.0\n",
    "simulation.noise_cm"
)]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn loads_a_full_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tank.toml");
    std::fs::write(
        &path,
        r#"
[sensor]
trigger_pin = 5
echo_pin = 18
echo_timeout_ms = 25

[storage]
path = "eeprom.bin"
size = 1024

[logging]
level = "debug"
rotation = "daily"

[simulation]
distance_cm = 42.5
noise_cm = 0.5
drift_cm_per_ping = 0.1
dropout_every = 7
seed = 99
"#,
    )
    .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.sensor.echo_timeout_ms, 25);
    assert_eq!(cfg.storage.size, 1024);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
    assert_eq!(cfg.simulation.dropout_every, 7);
    assert!((cfg.simulation.distance_cm - 42.5).abs() < f32::EPSILON);
}
