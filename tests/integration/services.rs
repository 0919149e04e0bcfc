#![cfg(target_os = "linux")]

#[path = "common/mod.rs"]
mod common;

use std::{
    fs,
    path::Path,
    process::{Child, Command as StdCommand},
    thread,
    time::Duration,
};

use common::{hstat, stdout_json, write_config};
use predicates::str::contains;
use tempfile::tempdir;

struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Lays out a fake daemon manager: a shell script answering `list` and
/// `get_service_config`, plus one temp directory per service.
fn fake_daemon(dir: &Path) -> ChildGuard {
    let tmp_a = dir.join("svc_a");
    let tmp_b = dir.join("svc_b");
    fs::create_dir_all(&tmp_a).expect("failed to create svc_a dir");
    fs::create_dir_all(&tmp_b).expect("failed to create svc_b dir");

    // The trailing `:` keeps the shell from exec'ing sleep, so the JVM flags
    // stay on this process's command line.
    let child = StdCommand::new("sh")
        .args(["-c", "sleep 30; :", "fake-jvm", "-Xms512m", "-Xmx1024m"])
        .spawn()
        .expect("failed to spawn service process");
    fs::write(tmp_a.join("application.pid"), format!("{}\n", child.id()))
        .expect("failed to write pid file");

    let script = format!(
        r#"case "$1" in
  list) printf 'svcA\n\nsvcB\nsvcC\n' ;;
  get_service_config)
    case "$2" in
      svcA) printf '{{"env":{{"SERVICE_TMP_DIR":"{a}"}}}}' ;;
      svcB) printf '{{"env":{{"SERVICE_TMP_DIR":"{b}"}}}}' ;;
      *) exit 3 ;;
    esac ;;
  *) exit 2 ;;
esac
"#,
        a = tmp_a.display(),
        b = tmp_b.display(),
    );
    let script_path = dir.join("daemon.sh");
    fs::write(&script_path, script).expect("failed to write daemon script");

    write_config(
        dir,
        &format!(
            r#"daemon:
  enabled: true
  command: sh
  list_args: ["{script}", list, --filter, all]
  config_args: ["{script}", get_service_config]
  exclude: [svcC]
  workers: 2
"#,
            script = script_path.display(),
        ),
    );

    // Give the process table a moment to show the child.
    thread::sleep(Duration::from_millis(100));
    ChildGuard(child)
}

#[test]
fn services_json_correlates_pid_files() {
    let temp = tempdir().expect("failed to create tempdir");
    let child = fake_daemon(temp.path());

    let output = hstat(temp.path())
        .args(["services", "--json"])
        .output()
        .expect("failed to run hstat");
    let report = stdout_json(&output);

    let records = report["sections"][0]["data"]
        .as_array()
        .expect("service records");
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["name"], "svcA");
    assert_eq!(records[0]["process"]["pid"], child.0.id());
    assert_eq!(records[0]["process_stats"]["xms"], "512m");
    assert_eq!(records[0]["process_stats"]["xmx"], "1024m");

    assert_eq!(records[1]["name"], "svcB");
    assert!(records[1]["process"].is_null());
    assert!(
        records[1]["failure"]
            .as_str()
            .unwrap_or_default()
            .contains("application.pid")
    );
}

#[test]
fn all_services_includes_excluded_names() {
    let temp = tempdir().expect("failed to create tempdir");
    let _child = fake_daemon(temp.path());

    let output = hstat(temp.path())
        .args(["services", "--json", "--all-services"])
        .output()
        .expect("failed to run hstat");
    let report = stdout_json(&output);

    let records = report["sections"][0]["data"]
        .as_array()
        .expect("service records");
    let names: Vec<&str> = records.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["svcA", "svcB", "svcC"]);
    assert!(
        records[2]["failure"]
            .as_str()
            .unwrap_or_default()
            .starts_with("service config unavailable")
    );
}

#[test]
fn services_table_shows_memory_flags() {
    let temp = tempdir().expect("failed to create tempdir");
    let _child = fake_daemon(temp.path());

    hstat(temp.path())
        .args(["services", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Application Statistic"))
        .stdout(contains("xms"))
        .stdout(contains("512m"))
        .stdout(contains("svcB"))
        .stdout(contains("unresolved: cannot read"));
}

#[test]
fn report_includes_services_when_enabled() {
    let temp = tempdir().expect("failed to create tempdir");
    let _child = fake_daemon(temp.path());

    hstat(temp.path())
        .args(["report", "--section", "services", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Application Statistic"))
        .stdout(contains("svcA"))
        .stdout(contains("1024m"));
}
