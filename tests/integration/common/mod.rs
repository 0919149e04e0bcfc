#![allow(dead_code)]

use std::{fs, path::Path};

use assert_cmd::Command;

/// `hstat` running inside `dir`, so no stray `hoststat.yaml` is picked up.
pub fn hstat(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hstat"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

pub fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("hoststat.yaml");
    fs::write(&path, contents).expect("failed to write config");
    path
}

pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}
