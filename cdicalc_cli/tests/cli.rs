use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn cdicalc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cdicalc"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("cdicalc binary should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn solve_prints_value_in_display_unit() {
    let output = cdicalc(&[
        "solve",
        "--target",
        "fringe_spacing",
        "--set",
        "wavelength=1angstrom",
        "--set",
        "detector_distance=1m",
        "--set",
        "crystal_size=100nm",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "fringe_spacing = 1.000 mm  (fringe_spacing)");
}

#[test]
fn config_file_changes_display_unit() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("cdicalc.toml");
    fs::write(
        &config,
        "version = \"0.1.0\"\nmodified = \"2026-10-15T09:30:00Z\"\n\n[display.fringe_spacing]\nunit = \"um\"\nprecision = 1\n",
    )
    .expect("config should be written");

    let output = cdicalc(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "solve",
        "--target",
        "fringe_spacing",
        "--set",
        "wavelength=1angstrom",
        "--set",
        "detector_distance=1m",
        "--set",
        "crystal_size=100nm",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "fringe_spacing = 1000.0 um  (fringe_spacing)");
}

#[test]
fn invalid_config_exits_with_calc_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("cdicalc.toml");
    fs::write(&config, "version = \"9.0.0\"\nmodified = \"2026-10-15T09:30:00Z\"\n").expect("config should be written");

    let output = cdicalc(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "solve",
        "--target",
        "xray_energy",
        "--set",
        "wavelength=1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Version mismatch"));
}

#[test]
fn oversized_precision_in_config_is_rejected_without_panicking() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("cdicalc.toml");
    fs::write(
        &config,
        "version = \"0.1.0\"\nmodified = \"2026-10-15T09:30:00Z\"\n\n[display.fringe_spacing]\nunit = \"um\"\nprecision = 100000\n",
    )
    .expect("config should be written");

    let output = cdicalc(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "solve",
        "--target",
        "fringe_spacing",
        "--set",
        "wavelength=1 angstrom",
        "--set",
        "detector_distance=1m",
        "--set",
        "crystal_size=100nm",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("precision"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}

#[test]
fn dimension_mismatch_exits_with_calc_error() {
    let output = cdicalc(&[
        "solve",
        "--target",
        "fringe_spacing",
        "--set",
        "wavelength=1angstrom",
        "--set",
        "detector_distance=1m",
        "--set",
        "crystal_size=10keV",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Dimension mismatch"));
}

#[test]
fn usage_errors_exit_with_two() {
    let output = cdicalc(&["solve", "--set", "wavelength=1"]);
    assert_eq!(output.status.code(), Some(2));

    let output = cdicalc(&["units", "--dimension", "temperature"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn derive_json_is_machine_readable() {
    let output = cdicalc(&["derive", "--set", "source_size=900um", "--set", "source_distance=31.5m", "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(value["derived"][0]["formula"], "source_divergence");
    assert_eq!(value["values"]["divergence"]["unit"], "urad");
    assert!(value["failures"].as_array().expect("array").is_empty());
}
