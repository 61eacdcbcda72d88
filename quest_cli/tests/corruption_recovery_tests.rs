//! Corruption recovery tests for questlog.
//!
//! These tests verify the system can handle:
//! - Corrupted template files (reported, never overwritten)
//! - Corrupted instance log lines
//! - Missing files
//! - Templates holding a rule that no longer decodes

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
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

#[test]
fn test_corrupted_template_file_is_reported() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("templates.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted templates");

    cli_in(data_dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}

#[test]
fn test_bad_entry_does_not_wipe_existing_templates() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let templates_path = data_dir.join("templates.json");

    let book = r#"{
  "templates": {
    "run": {
      "id": "run",
      "title": "Morning run",
      "kind": "daily",
      "recurrence_rule": "FREQ=DAILY",
      "due_date": null,
      "base_points": 20,
      "is_active": true,
      "created_at": "2026-10-01T08:00:00Z"
    },
    "gym": {
      "id": "gym",
      "title": "Gym",
      "kind": "weekly",
      "recurrence_rule": "FREQ=WEEKLY;BYDAY=MO",
      "due_date": null,
      "base_points": 20,
      "is_active": true,
      "created_at": "2026-10-01T08:00:00Z"
    }
  }
}"#;
    fs::write(&templates_path, book).unwrap();

    cli_in(data_dir)
        .args(["add", "read", "--title", "Read", "--rule", "FREQ=DAILY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));

    let after = fs::read_to_string(&templates_path).unwrap();
    assert_eq!(after, book, "template file must be left as it was");
    assert!(after.contains("\"run\""));
    assert!(!after.contains("\"read\""));
}

#[test]
fn test_corrupted_log_lines_are_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_in(data_dir)
        .args(["add", "run", "--title", "Run", "--rule", "FREQ=DAILY"])
        .assert()
        .success();

    for date in ["2026-10-16", "2026-10-17"] {
        cli_in(data_dir)
            .args(["done", "run", "--date", date])
            .assert()
            .success();
    }

    let log_path = data_dir.join("instances.jsonl");
    let mut log = fs::OpenOptions::new().append(true).open(&log_path).unwrap();
    writeln!(log, "{{garbage line").unwrap();

    cli_in(data_dir)
        .args(["done", "run", "--date", "2026-10-18"])
        .assert()
        .success();

    cli_in(data_dir)
        .args(["streak", "run", "--today", "2026-10-18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 days streak"));
}

#[test]
fn test_missing_log_means_no_activity() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_in(data_dir)
        .args(["add", "run", "--title", "Run", "--rule", "FREQ=DAILY"])
        .assert()
        .success();

    cli_in(data_dir)
        .args(["calendar", "run", "--days", "3", "--end", "2026-10-18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0/3 days completed, 0 XP"));
}

#[test]
fn test_stored_malformed_rule_is_reported_not_downgraded() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let book = r#"{
  "templates": {
    "odd": {
      "id": "odd",
      "title": "Odd quest",
      "kind": "daily",
      "recurrence_rule": "FREQ=HOURLY",
      "due_date": null,
      "base_points": 20,
      "is_active": true,
      "created_at": "2026-10-01T08:00:00Z"
    }
  }
}"#;
    fs::write(data_dir.join("templates.json"), book).unwrap();

    cli_in(data_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("unreadable schedule"))
        .stdout(predicate::str::contains("One-time task").not());

    cli_in(data_dir)
        .args(["done", "odd", "--date", "2026-10-18"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed recurrence rule"));
}
