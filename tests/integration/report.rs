#[path = "common/mod.rs"]
mod common;

use common::{hstat, stdout_json};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn common_section_renders_table() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["report", "--section", "common", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Common metrics"))
        .stdout(contains("Load Average"))
        .stdout(contains("1m: "))
        .stdout(contains("up "));
}

#[test]
fn json_report_keeps_requested_order() {
    let temp = tempdir().expect("failed to create tempdir");

    let output = hstat(temp.path())
        .args(["report", "--section", "disk", "--section", "memory", "--json"])
        .output()
        .expect("failed to run hstat");
    let report = stdout_json(&output);

    let sections = report["sections"].as_array().expect("sections array");
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["section"], "memory");
    assert_eq!(sections[1]["section"], "disk");
    assert!(sections[0]["data"]["total"].as_u64().unwrap_or_default() > 0);
    assert!(
        ["normal", "warning", "critical"]
            .contains(&sections[0]["data"]["level"]["severity"].as_str().unwrap_or_default())
    );
}

#[test]
fn raw_bytes_without_color() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["report", "--section", "memory", "--raw-bytes", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Virtual Memory"))
        .stdout(contains("\x1b[").not())
        .stdout(predicate::str::is_match(r"\| \d{4,} ").expect("valid regex"));
}

#[test]
fn services_section_falls_back_when_daemon_disabled() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["report", "--section", "services", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Application Statistic"))
        .stdout(contains("Unable to collect daemon applications metrics"));
}

#[test]
fn default_report_omits_services() {
    let temp = tempdir().expect("failed to create tempdir");

    let output = hstat(temp.path())
        .args(["report", "--json"])
        .output()
        .expect("failed to run hstat");
    let report = stdout_json(&output);

    let names: Vec<&str> = report["sections"]
        .as_array()
        .expect("sections array")
        .iter()
        .filter_map(|section| section["section"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["common", "memory", "swap", "cpu", "disk", "interfaces", "users"]
    );
}

#[test]
fn invalid_stream_interval_fails() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["report", "--stream", "soon"])
        .assert()
        .failure();
}
