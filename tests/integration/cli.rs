#[path = "common/mod.rs"]
mod common;

use common::{hstat, write_config};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn config_prints_defaults_without_a_file() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("load_average"))
        .stdout(contains("protei-daemon"))
        .stdout(contains("application.pid"));
}

#[test]
fn config_file_overrides_one_policy() {
    let temp = tempdir().expect("failed to create tempdir");
    write_config(
        temp.path(),
        "thresholds:\n  disk:\n    warning: 50\n    critical: 60\n",
    );

    let output = hstat(temp.path())
        .arg("config")
        .output()
        .expect("failed to run hstat");
    assert!(output.status.success());

    let config: serde_yaml::Value =
        serde_yaml::from_slice(&output.stdout).expect("config output is YAML");
    assert_eq!(config["thresholds"]["disk"]["warning"].as_f64(), Some(50.0));
    assert_eq!(config["thresholds"]["disk"]["critical"].as_f64(), Some(60.0));
    assert_eq!(
        config["thresholds"]["load_average"]["critical"].as_f64(),
        Some(14.0)
    );
}

#[test]
fn config_expands_environment_variables() {
    let temp = tempdir().expect("failed to create tempdir");
    write_config(temp.path(), "daemon:\n  command: ${HSTAT_TEST_DAEMON}\n");

    hstat(temp.path())
        .env("HSTAT_TEST_DAEMON", "/opt/daemon/bin/ctl")
        .arg("config")
        .assert()
        .success()
        .stdout(contains("/opt/daemon/bin/ctl"));

    hstat(temp.path())
        .env_remove("HSTAT_TEST_DAEMON")
        .arg("config")
        .assert()
        .failure()
        .stderr(contains("HSTAT_TEST_DAEMON"));
}

#[test]
fn explicit_missing_config_fails() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["--config", "absent.yaml", "config"])
        .assert()
        .failure()
        .stderr(contains("absent.yaml"));
}

#[test]
fn unknown_config_key_fails() {
    let temp = tempdir().expect("failed to create tempdir");
    write_config(temp.path(), "thresholds:\n  gpu:\n    warning: 1\n    critical: 2\n");

    hstat(temp.path()).arg("config").assert().failure();
}

#[test]
fn invalid_log_level_is_rejected() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["--log-level", "loud", "config"])
        .assert()
        .failure()
        .stderr(contains("invalid log level"));
}

#[test]
fn services_require_daemon_integration() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .arg("services")
        .assert()
        .failure()
        .stderr(contains("DaemonDisabled"));
}

#[test]
fn logs_stay_off_stdout() {
    let temp = tempdir().expect("failed to create tempdir");

    hstat(temp.path())
        .args(["--log-level", "debug", "config"])
        .assert()
        .success()
        .stdout(contains("DEBUG").not())
        .stderr(contains("using defaults"));
}
