use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_many_requests_streaming() {
    let dir = tempdir().unwrap();
    let methods = dir.path().join("methods.json");
    common::write_cash_methods(&methods).unwrap();

    let rows = 2_000;
    let output_path = dir.path().join("large_test.csv");
    common::generate_requests_csv(&output_path, rows).expect("Failed to generate CSV");

    let output = Command::new(cargo_bin!("ridepay"))
        .arg(&output_path)
        .arg("--methods")
        .arg(&methods)
        .arg("--no-simulation")
        .arg("--history")
        .arg("simulated")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to process requests");

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Header + one outcome per request
    assert_eq!(stdout.lines().count(), rows + 1);
}
