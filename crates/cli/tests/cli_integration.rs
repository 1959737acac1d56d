use std::path::PathBuf;
use std::process::Command;

fn sysoff() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sysoff"))
}

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sysoff-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_first_boot_console() {
    let output = sysoff().output().expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "nrf54l15dk system off demo");
    assert!(lines.contains(&"Retained data: INVALID"));
    assert!(lines.contains(&"Boot count: 1"));
    assert_eq!(
        lines.last().copied(),
        Some("Entering system off; press any switch to restart")
    );
}

#[test]
fn test_cli_press_sequence() {
    let output = sysoff()
        .args(["--press", "SW1", "--press", "sw3"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("LATCH REGISTER FOR P1: 512"));
    assert!(stdout.contains("WAKEUP SRC: SW1"));
    assert!(stdout.contains("WAKEUP SRC: SW3"));
    assert!(stdout.contains("Boot count: 3"));
    assert!(stdout.contains("Off count: 2"));
}

#[test]
fn test_cli_json_snapshot() {
    let output = sysoff()
        .args(["--timer", "--step", "timer", "--json"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Failed to parse JSON");
    assert_eq!(json["status"], "pass");
    assert_eq!(json["boots_observed"], 2);
    assert_eq!(json["device"]["retained"]["valid"], true);
    assert_eq!(json["device"]["retained"]["record"]["boots"], 2);
    assert_eq!(json["device"]["last_wake_source"], "unknown");
}

#[test]
fn test_cli_script_expectations() {
    let script = write_temp(
        "pass.yaml",
        r#"
schema_version: "1.0"
steps:
  - action: press
    switch: SW0
  - action: corrupt
    offset: 12
  - action: press
    switch: SW2
expect:
  boots: 1
  off_count: 1
  last_wake_source: SW2
  console_contains:
    - "Retained data: INVALID"
"#,
    );
    let output = sysoff()
        .args(["--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_expectation_mismatch() {
    let script = write_temp(
        "fail.yaml",
        r#"
schema_version: "1.0"
steps:
  - action: press
    switch: SW1
expect:
  boots: 5
"#,
    );
    let output = sysoff()
        .args(["--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("boots: expected 5, got 2"));
}

#[test]
fn test_cli_bad_config() {
    let output = sysoff()
        .args(["--board", "does/not/exist.yaml"])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));

    let script = write_temp("bad_schema.yaml", "schema_version: \"2.0\"\n");
    let output = sysoff()
        .args(["--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_rejects_switch_outside_precedence() {
    let board = write_temp(
        "p1_only.yaml",
        r#"
name: "p1-only"
retained: { base: 0x2003FC00, size: "1KB" }
ports:
  - { id: "p0", index: 0, base_address: 0x5010A000 }
  - { id: "p1", index: 1, base_address: 0x500D8200 }
led: { port: "p1", pin: 10 }
switches:
  - { id: SW0, port: "p1", pin: 13, pulses: 1 }
  - { id: SW3, port: "p0", pin: 4, pulses: 4 }
precedence: ["p1"]
"#,
    );
    let output = sysoff()
        .args(["--board", board.to_str().unwrap(), "--press", "SW3"])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing from precedence"));
}

#[test]
fn test_cli_runtime_error() {
    let output = sysoff()
        .args(["--step", "corrupt:64"])
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cli_demo_script() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let script = root.join("demos/sw1_cycle.yaml");

    let output = sysoff()
        .args(["--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
