//! Concurrency tests for questlog.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the instance log simultaneously (file locking)
//! - Read the log while other processes write to it
//! - Add templates at the same time without losing any

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::cargo_bin("questlog").expect("Failed to find questlog binary")
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI pointed at `data_dir`, with an empty config file there so the host's
/// own questlog config never affects results
fn cli_in(data_dir: &Path) -> Command {
    let config = data_dir.join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").expect("Failed to write test config");
    }
    let mut cmd = cli();
    cmd.arg("--config").arg(config).arg("--data-dir").arg(data_dir);
    cmd
}

fn add_daily_quest(data_dir: &PathBuf) {
    cli_in(data_dir)
        .args(["add", "run", "--title", "Run", "--rule", "FREQ=DAILY"])
        .assert()
        .success();
}

#[test]
fn test_sequential_appends_are_all_kept() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    add_daily_quest(&data_dir);

    for i in 0..5u64 {
        thread::sleep(Duration::from_millis(i * 5));
        cli_in(&data_dir)
            .args(["done", "run", "--date", &format!("2026-10-1{}", i)])
            .assert()
            .success();
    }

    let log_path = data_dir.join("instances.jsonl");
    let content = std::fs::read_to_string(&log_path).expect("Failed to read instance log");
    let count = content.lines().count();
    assert_eq!(count, 5, "Expected 5 instances, got {}", count);
}

#[test]
fn test_parallel_appends_do_not_interleave() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    add_daily_quest(&data_dir);

    let handles: Vec<_> = (1..=8)
        .map(|day| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli_in(&data_dir)
                    .args(["done", "run", "--date", &format!("2026-10-{:02}", day)])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("instances.jsonl")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 8);
    for line in lines {
        let parsed: serde_json::Value =
            serde_json::from_str(line).expect("every line should be a complete JSON object");
        assert_eq!(parsed["template_id"], "run");
    }

    cli_in(&data_dir)
        .args(["streak", "run", "--today", "2026-10-08"])
        .assert()
        .success()
        .stdout(predicates::str::contains("8 days streak"));
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    add_daily_quest(&data_dir);

    let writer_dir = data_dir.clone();
    let writer = thread::spawn(move || {
        for day in 1..=5 {
            cli_in(&writer_dir)
                .args(["done", "run", "--date", &format!("2026-09-{:02}", day)])
                .assert()
                .success();
        }
    });

    for _ in 0..5 {
        cli_in(&data_dir)
            .args(["calendar", "run", "--days", "5", "--end", "2026-09-05"])
            .assert()
            .success();
    }

    writer.join().expect("writer thread panicked");
}

#[test]
fn test_parallel_adds_keep_every_template() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    cli_in(&data_dir).arg("list").assert().success();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli_in(&data_dir)
                    .args(["add", &format!("quest{}", i), "--title", "Quest"])
                    .args(["--rule", "FREQ=DAILY"])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("add thread panicked");
    }

    let stored = std::fs::read_to_string(data_dir.join("templates.json")).unwrap();
    let book: serde_json::Value = serde_json::from_str(&stored).unwrap();
    let templates = book["templates"].as_object().expect("templates map");
    assert_eq!(templates.len(), 6);
}
