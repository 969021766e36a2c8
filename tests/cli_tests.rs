//! Tests for the command-line binary
#![cfg(unix)]

mod common;

use common::Fixture;
use std::process::{Command, Output};

fn runner_cli(fx: &Fixture, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_test262-runner"))
        .arg(fx.suite().join("test"))
        .arg("-b")
        .arg(fx.bin_dir())
        .arg("--work-dir")
        .arg(fx.work_dir())
        .args(["-j", "2"])
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn test_passing_run_exits_zero() {
    let fx = Fixture::new();
    fx.add_test("language/ok.js", "", "1;");
    let output = runner_cli(&fx, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("-- Testing: 1 tests, max 2 concurrent tasks --"));
    assert!(stdout.contains("| Results              |   PASS   |"));
    assert!(stdout.contains("| Pass Rate            |  100.00% |"));
    assert!(stdout.contains("Testing time: "));
    assert!(stdout.contains("\nDetails:\n"));
    assert!(!stdout.contains("Execute failed:"));
}

#[test]
fn test_failing_run_exits_one_and_lists_failures() {
    let fx = Fixture::new();
    fx.add_test("language/ok.js", "", "1;");
    fx.add_test("language/boom.js", "", "RUNTIME_FAIL");
    let output = runner_cli(&fx, &["--verbose-results"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("| Results              |   FAIL   |"));
    assert!(stdout.contains("EXECUTE FAIL: test/language/boom.js"));
    assert!(stdout.contains("Details:"));
    assert!(stdout.contains("Execute failed:\ntest/language/boom.js\n"));
}

#[test]
fn test_fatal_error_exits_two() {
    let fx = Fixture::new();
    fx.add_test("language/ok.js", "", "1;");
    let output = runner_cli(&fx, &["--compiler", "no-such-compiler"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("compiler not found"));
}

#[test]
fn test_json_report() {
    let fx = Fixture::new();
    fx.add_test("language/ok.js", "", "1;");
    fx.add_test("language/skip.js", "features: [Temporal]\n", "1;");
    let json_path = fx.root().join("report.json");
    let output = runner_cli(&fx, &["--json", json_path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json["status"], "PASS");
    assert_eq!(json["total"], 2);
    assert_eq!(json["counts"]["TEST_SKIPPED"], 1);
    assert_eq!(json["pass_rate"], 1.0);
}
