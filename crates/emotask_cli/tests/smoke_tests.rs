//! CLI smoke tests: verify basic binary behavior.

use std::process::Command;

fn cli_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_emotask"));
    cmd.env_remove("EMOTASK_ASSETS_DIR")
        .env_remove("EMOTASK_ERROR_LOG")
        .env("EMOTASK_SAMPLE_MS", "10")
        .env("EMOTASK_CONFIG", "/tmp/nonexistent_emotask_config_12345.toml");
    cmd
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage"),
        "Expected usage info in --help output"
    );
    assert!(stdout.contains("--once"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("emotask"),
        "Expected binary name in --version output"
    );
}

#[test]
fn test_invalid_config_does_not_panic() {
    let output = cli_bin()
        .arg("--config")
        .arg("/tmp/nonexistent_emotask_config_12345.toml")
        .arg("--help")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn test_once_prints_a_face() {
    let output = cli_bin().arg("--once").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cpu="), "Expected readings, got: {}", stdout);
    assert!(stdout.contains("face: "), "Expected a face, got: {}", stdout);
}

#[test]
fn test_assets_without_happy_face_fail() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--once")
        .arg("--assets")
        .arg(tmp.path())
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("happy"), "Expected a missing-face error: {}", stderr);
}
