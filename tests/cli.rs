//! Binary-level checks of the command-line surface.

use std::process::Command;

fn cdpconsole() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cdpconsole"));
    // Keep the user's real config out of the way.
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

#[test]
fn test_missing_url_prints_usage_and_fails() {
    let output = cdpconsole().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn test_non_websocket_url_is_a_connection_error() {
    let output = cdpconsole().arg("http://127.0.0.1:9222/json").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("[cdp-console] Error: "), "stdout: {stdout}");
}

#[test]
fn test_refused_connection_exits_with_error() {
    let output = cdpconsole()
        .args(["--connect-timeout-secs", "2", "ws://127.0.0.1:1/devtools/page/x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[cdp-console] Error: "), "stdout: {stdout}");
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let output = cdpconsole()
        .args(["-c", "/nonexistent/cdpconsole.toml", "ws://127.0.0.1:1/x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Config file not found"), "stdout: {stdout}");
}

#[test]
fn test_version_flag() {
    let output = cdpconsole().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("cdpconsole "));
}
