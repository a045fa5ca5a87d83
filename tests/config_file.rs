use std::fs;

use vu_monitor::{
    actuator::OutputProfile,
    config::{Backend, Config},
    ChannelId, ConfigError, CurveKind,
};

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn loads_the_default_file_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vu_monitor.toml");
    fs::write(
        &path,
        r#"
        polling_window_ticks = 5

        [curve]
        kind = "linear"
        ceiling = 200.0

        [output]
        profile = "hard-pwm"
        backend = "log"
        "#,
    )
    .unwrap();

    let config = Config::load_with(None, &path, no_env).unwrap();
    assert_eq!(config.polling_window_ticks, 5);
    assert_eq!(config.curve.kind, CurveKind::Linear);
    assert_eq!(config.output.profile, OutputProfile::HardPwm);
    assert_eq!(config.output.backend, Backend::Log);
    assert_eq!(config.actuator_max(), 200.0);

    let specs = config.channel_specs();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].label, "network");
    assert_eq!(specs[0].id, ChannelId(1));
    assert!(specs.iter().all(|s| s.max == 200.0));
}

#[test]
fn explicit_file_beats_the_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let default_path = dir.path().join("vu_monitor.toml");
    let explicit_path = dir.path().join("meters.toml");
    fs::write(&default_path, "polling_window_ticks = 2").unwrap();
    fs::write(&explicit_path, "polling_window_ticks = 7").unwrap();

    let config = Config::load_with(Some(explicit_path.as_path()), &default_path, no_env).unwrap();
    assert_eq!(config.polling_window_ticks, 7);
}

#[test]
fn env_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vu_monitor.toml");
    fs::write(&path, "max_bandwidth_bytes_per_sec = 1000").unwrap();

    let config = Config::load_with(None, &path, |key| {
        (key == "VU_MONITOR_MAX_BANDWIDTH").then(|| "125000000".to_string())
    })
    .unwrap();
    assert_eq!(config.max_bandwidth_bytes_per_sec, 125_000_000);
}

#[test]
fn invalid_toml_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vu_monitor.toml");
    fs::write(&path, "polling_window_ticks = \"lots\"").unwrap();

    match Config::load_with(None, &path, no_env) {
        Err(ConfigError::ParseError { path: p, .. }) => assert!(p.ends_with("vu_monitor.toml")),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn file_values_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vu_monitor.toml");
    fs::write(&path, "[output]\nprofile = \"single-dac\"\n[[output.channels]]\nmetric = \"cpu\"\nchannel = 1").unwrap();

    let err = Config::load_with(None, &path, no_env).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "output.channels"));
}
