//! Integration tests for the `fait` CLI binary.
//!
//! These use `assert_cmd` and `predicates` to drive the real binary. Commands
//! that write run against a copy of the fixture in a temporary directory.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to a fixture file.
fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Helper: copy the store fixture into a fresh temp dir.
fn scratch_store() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("store.json");
    std::fs::copy(fixture("store.json"), &path).expect("copy fixture");
    (dir, path)
}

/// `fait` as seen on Saturday 2024-06-01, the day the fixture dates are booked from.
fn fait() -> Command {
    fait_at("2024-06-01")
}

fn fait_at(today: &str) -> Command {
    let mut cmd = Command::cargo_bin("fait").unwrap();
    cmd.args(["--today", today]);
    cmd
}

fn monday_times(store: &Path) -> Value {
    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-03", "--days", "1"])
        .arg("--data")
        .arg(store)
        .output()
        .unwrap();
    assert!(output.status.success());
    stdout_json(&output)
        .get(0)
        .map(|day| day["times"].clone())
        .unwrap_or(Value::Null)
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_for_two_weeks() {
    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-03", "--days", "14"])
        .arg("--data")
        .arg(fixture("store.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let days = stdout_json(&output);
    let dates: Vec<&str> = days
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-06-03", "2024-06-05", "2024-06-10"]);
    assert_eq!(
        days[1]["times"],
        serde_json::json!(["14:00", "14:30"])
    );
}

#[test]
fn slots_skip_blackout_dates() {
    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-17", "--days", "7"])
        .arg("--data")
        .arg(fixture("store.json"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}

#[test]
fn slots_flat_uses_increment_as_duration() {
    let output = fait()
        .args([
            "slots", "--provider", "agent-1", "--from", "2024-06-05", "--days", "1",
            "--increment", "20", "--flat",
        ])
        .arg("--data")
        .arg(fixture("store.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    assert_eq!(
        stdout_json(&output),
        serde_json::json!([
            {"date": "2024-06-05", "time": "14:00", "duration_minutes": 20},
            {"date": "2024-06-05", "time": "14:20", "duration_minutes": 20},
            {"date": "2024-06-05", "time": "14:40", "duration_minutes": 20},
        ])
    );
}

#[test]
fn slots_read_increment_from_config() {
    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-03", "--days", "1"])
        .arg("--data")
        .arg(fixture("store.json"))
        .arg("--config")
        .arg(fixture("fait.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let days = stdout_json(&output);
    assert_eq!(days[0]["times"], serde_json::json!(["09:00", "10:00", "11:00"]));
}

#[test]
fn slots_for_unknown_provider_is_empty() {
    fait()
        .args(["slots", "--provider", "nobody", "--from", "2024-06-03"])
        .arg("--data")
        .arg(fixture("store.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn slots_reject_bad_date() {
    fait()
        .args(["slots", "--provider", "agent-1", "--from", "03/06/2024"])
        .arg("--data")
        .arg(fixture("store.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from"));
}

// ─────────────────────────────────────────────────────────────────────────────
// validate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_accepts_good_rules() {
    fait()
        .arg("validate")
        .arg("-i")
        .arg(fixture("store.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 recurring and 1 ranged rules are valid"));
}

#[test]
fn validate_reports_first_bad_rule() {
    fait()
        .arg("validate")
        .arg("-i")
        .arg(fixture("invalid_rules.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("recurring_rules[1] is invalid"));
}

#[test]
fn validate_reads_stdin() {
    fait()
        .arg("validate")
        .write_stdin(r#"{"ranged_rules":[{"provider_id":"a","start_date":"2024-06-01","start_time":"10:00","end_time":"11:00"}]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 recurring and 1 ranged"));
}

// ─────────────────────────────────────────────────────────────────────────────
// booking lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn book_then_double_book_fails() {
    let (_dir, store) = scratch_store();

    let output = fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "09:30", "--price", "8000",
        ])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());
    let booking = stdout_json(&output);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["scheduled_time"], "09:30");

    fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-2", "--date", "2024-06-03",
            "--time", "09:30",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already booked"));

    // The booked time no longer shows up.
    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-03", "--days", "1"])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    let times = stdout_json(&output)[0]["times"].clone();
    assert!(!times.as_array().unwrap().contains(&Value::from("09:30")));
}

#[test]
fn book_outside_availability_fails() {
    let (_dir, store) = scratch_store();

    fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-04",
            "--time", "09:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No availability"));
}

#[test]
fn book_in_the_past_fails() {
    let (_dir, store) = scratch_store();

    fait_at("2024-06-04")
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "09:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No availability"));
}

#[test]
fn concurrent_bookings_of_one_slot_keep_exactly_one() {
    let (_dir, store) = scratch_store();

    let handles: Vec<_> = ["client-a", "client-b"]
        .into_iter()
        .map(|client| {
            let store = store.clone();
            std::thread::spawn(move || {
                fait()
                    .args([
                        "book", "--provider", "agent-1", "--client", client, "--date",
                        "2024-06-03", "--time", "09:00",
                    ])
                    .arg("--data")
                    .arg(&store)
                    .output()
                    .unwrap()
            })
        })
        .collect();
    let outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = outputs.iter().filter(|o| o.status.success()).count();
    assert_eq!(successes, 1);

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(saved["bookings"].as_array().unwrap().len(), 1);
}

#[test]
fn book_recurring_series() {
    let (_dir, store) = scratch_store();

    let output = fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "11:00", "--recurrence", "weekly", "--occurrences", "2",
        ])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());

    let series = stdout_json(&output);
    let series = series.as_array().unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0]["recurrence_group"], series[1]["recurrence_group"]);
    assert_eq!(series[1]["scheduled_date"], "2024-06-10");
}

#[test]
fn recurrence_requires_occurrences() {
    fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "11:00", "--recurrence", "weekly", "--data", "unused.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--occurrences"));
}

#[test]
fn oversized_series_is_rejected() {
    let (_dir, store) = scratch_store();

    fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "11:00", "--recurrence", "weekly", "--occurrences", "4000000000",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most 52 occurrences"));
}

#[test]
fn cancel_reschedule_and_complete() {
    let (_dir, store) = scratch_store();

    let output = fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "10:00", "--price", "4500",
        ])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    let id = stdout_json(&output)["id"].as_str().unwrap().to_string();

    let output = fait()
        .args(["reschedule", "--booking", &id, "--date", "2024-06-05", "--time", "14:30"])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["scheduled_date"], "2024-06-05");

    let output = fait()
        .args(["cancel", "--booking", &id, "--reason", "rain"])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());
    let cancelled = stdout_json(&output);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["refund_amount"], 4500);

    fait()
        .args(["complete", "--booking", &id])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot complete a booking that is cancelled"));
}

#[test]
fn unknown_booking_id_fails() {
    let (_dir, store) = scratch_store();

    fait()
        .args(["complete", "--booking", "1b4e28ba-2fa1-11d2-883f-0016d3cca427"])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Booking not found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// availability
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn clearing_a_weekday_blocks_booking_it() {
    let (_dir, store) = scratch_store();

    fait()
        .args(["availability", "set-weekly", "--provider", "agent-1", "--day", "1"])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();
    assert_eq!(monday_times(&store), Value::Null);

    fait()
        .args([
            "book", "--provider", "agent-1", "--client", "client-1", "--date", "2024-06-03",
            "--time", "09:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No availability"));
}

#[test]
fn set_and_add_weekly_windows() {
    let (_dir, store) = scratch_store();

    fait()
        .args([
            "availability", "set-weekly", "--provider", "agent-1", "--day", "1", "--window",
            "13:00-14:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();
    fait()
        .args([
            "availability", "add-weekly", "--provider", "agent-1", "--day", "1", "--start",
            "08:00", "--end", "08:30",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();

    assert_eq!(
        monday_times(&store),
        serde_json::json!(["08:00", "13:00", "13:30"])
    );
}

#[test]
fn set_weekly_rejects_malformed_and_inverted_windows() {
    let (_dir, store) = scratch_store();

    fait()
        .args([
            "availability", "set-weekly", "--provider", "agent-1", "--day", "1", "--window",
            "09:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("HH:MM-HH:MM"));

    fait()
        .args([
            "availability", "set-weekly", "--provider", "agent-1", "--day", "1", "--window",
            "12:00-09:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be after start time"));

    // The original Monday window is untouched.
    assert_eq!(monday_times(&store).as_array().unwrap().len(), 6);
}

#[test]
fn ranged_rules_can_be_added_and_removed() {
    let (_dir, store) = scratch_store();
    let range = [
        "--provider", "agent-1", "--start-date", "2024-06-05", "--start", "14:00", "--end",
        "15:00",
    ];

    fait()
        .args(["availability", "remove-range"])
        .args(range)
        .arg("--data")
        .arg(&store)
        .assert()
        .success();
    fait()
        .args(["availability", "remove-range"])
        .args(range)
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No date-ranged rule"));

    fait()
        .args([
            "availability", "add-range", "--provider", "agent-1", "--start-date", "2024-06-06",
            "--end-date", "2024-06-07", "--start", "10:00", "--end", "11:00",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();

    let output = fait()
        .args(["slots", "--provider", "agent-1", "--from", "2024-06-04", "--days", "4"])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    let dates: Vec<String> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2024-06-06", "2024-06-07"]);
}

#[test]
fn block_show_and_unblock() {
    let (_dir, store) = scratch_store();

    fait()
        .args([
            "availability", "block", "--provider", "agent-1", "--date", "2024-06-03", "--reason",
            "holiday",
        ])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();
    assert_eq!(monday_times(&store), Value::Null);

    let output = fait()
        .args(["availability", "show", "--provider", "agent-1"])
        .arg("--data")
        .arg(&store)
        .output()
        .unwrap();
    let shown = stdout_json(&output);
    let blocked: Vec<&str> = shown["unavailable_dates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["date"].as_str().unwrap())
        .collect();
    assert_eq!(blocked, vec!["2024-06-03", "2024-06-17"]);
    assert_eq!(shown["recurring_rules"].as_array().unwrap().len(), 1);

    fait()
        .args(["availability", "unblock", "--provider", "agent-1", "--date", "2024-06-03"])
        .arg("--data")
        .arg(&store)
        .assert()
        .success();
    assert_eq!(monday_times(&store).as_array().unwrap().len(), 6);

    fait()
        .args(["availability", "unblock", "--provider", "agent-1", "--date", "2024-06-03"])
        .arg("--data")
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not blocked"));
}
