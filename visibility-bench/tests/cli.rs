use std::process::{Command, Output};

use visibility_test::fixtures::TestDir;

const BENCH_EXE: &str = env!("CARGO_BIN_EXE_visibility-bench");

fn bench(dir: &TestDir, args: &[&str]) -> Output {
    Command::new(BENCH_EXE)
        .args(args)
        .env_remove("RUST_LOG")
        .env("VB__STORAGE__TYPE", "filesystem")
        .env("VB__STORAGE__PATH", dir.storage_path())
        .env("VB__OUTPUT__WRITE_LOG", dir.path("writes.tsv"))
        .env("VB__OUTPUT__DETECTION_LOG", dir.path("detections.tsv"))
        .env("VB__OUTPUT__LEDGER", dir.path("ledger.tsv"))
        .output()
        .expect("Failed to run visibility-bench")
}

#[test]
fn prints_version() {
    let dir = TestDir::new();
    let output = bench(&dir, &["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("visibility-bench "));
}

#[test]
fn produce_detect_summarize() {
    let dir = TestDir::new();
    let sizing = ["--iterations", "3", "--size", "16K"];

    let output = bench(
        &dir,
        &[&["produce"][..], &sizing, &["--write-interval", "0s"]].concat(),
    );
    assert!(output.status.success(), "produce failed: {output:?}");

    let output = bench(
        &dir,
        &[&["detect"][..], &sizing, &["--max-wait", "1s"]].concat(),
    );
    assert!(output.status.success(), "detect failed: {output:?}");

    let output = bench(&dir, &["summarize", "--label", "cli"]);
    assert!(output.status.success(), "summarize failed: {output:?}");

    let ledger = std::fs::read_to_string(dir.path("ledger.tsv")).unwrap();
    assert_eq!(ledger.lines().count(), 1);
    assert!(ledger.starts_with("cli\t"));
}

#[test]
fn summarize_without_samples_fails() {
    let dir = TestDir::new();
    std::fs::write(dir.path("writes.tsv"), "").unwrap();
    std::fs::write(dir.path("detections.tsv"), "").unwrap();

    let output = bench(&dir, &["summarize"]);
    assert!(!output.status.success());
    assert!(!dir.path("ledger.tsv").exists());
}

#[test]
fn unreachable_backend_fails() {
    let dir = TestDir::new();
    let missing = dir.path("missing");

    let output = Command::new(BENCH_EXE)
        .args(["detect", "--iterations", "1"])
        .env("VB__STORAGE__TYPE", "filesystem")
        .env("VB__STORAGE__PATH", &missing)
        .env("VB__OUTPUT__DETECTION_LOG", dir.path("detections.tsv"))
        .output()
        .expect("Failed to run visibility-bench");

    assert!(!output.status.success());
    assert!(!dir.path("detections.tsv").exists());
}

#[test]
fn run_in_memory() {
    let dir = TestDir::new();
    let output = Command::new(BENCH_EXE)
        .args(["run", "--iterations", "3", "--size", "1K", "--label", "memory"])
        .env("VB__STORAGE__TYPE", "memory")
        .env("VB__STORAGE__DELAY", "50ms")
        .env("VB__RUN__WRITE_INTERVAL", "0s")
        .env("VB__OUTPUT__WRITE_LOG", dir.path("writes.tsv"))
        .env("VB__OUTPUT__DETECTION_LOG", dir.path("detections.tsv"))
        .env("VB__OUTPUT__LEDGER", dir.path("ledger.tsv"))
        .output()
        .expect("Failed to run visibility-bench");

    assert!(output.status.success(), "run failed: {output:?}");
    let ledger = std::fs::read_to_string(dir.path("ledger.tsv")).unwrap();
    assert!(ledger.starts_with("memory\t"));
}
