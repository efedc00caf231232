#![cfg(unix)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const EVENTS: &str = r#"{"Action":"run","Test":"TestA"}
{"Action":"pass","Test":"TestA"}
{"Action":"fail","Test":"TestB"}
"#;

fn proctor(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_proctor"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

/// A codebase whose "test suite" is a shell script printing test2json events.
fn scripted_codebase(dir: &Path, events: &str) {
    std::fs::write(dir.join("emit.sh"), format!("cat <<'JSON'\n{events}JSON\n")).unwrap();
    std::fs::write(
        dir.join(".proctor.toml"),
        r#"
[provenance]
required = false

[runner]
kind = "command"
command = "sh"
args = ["emit.sh"]
"#,
    )
    .unwrap();
}

#[test]
fn version_prints_package_version() {
    let out = proctor(&["version"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), format!("proctor {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn run_writes_predicate_to_stdout() {
    let dir = tempdir().unwrap();
    scripted_codebase(dir.path(), EVENTS);

    let out = proctor(&["run", "-d", dir.path().to_str().unwrap(), "--attest", "false", "-o", "-"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["result"], "fail");
    assert_eq!(json["passedTests"], serde_json::json!(["TestA"]));
    assert_eq!(json["failedTests"], serde_json::json!(["TestB"]));
}

#[test]
fn fail_on_test_failure_sets_exit_code() {
    let dir = tempdir().unwrap();
    scripted_codebase(dir.path(), EVENTS);
    let output = dir.path().join("out.json");

    let out = proctor(&[
        "run",
        dir.path().to_str().unwrap(),
        "-a",
        "false",
        "-o",
        output.to_str().unwrap(),
        "--fail-on-test-failure",
    ]);
    assert!(!out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(json["result"], "fail");
}

#[test]
fn attesting_outside_a_repository_fails() {
    let dir = tempdir().unwrap();
    scripted_codebase(dir.path(), EVENTS);

    let out = proctor(&["run", "-d", dir.path().to_str().unwrap(), "-o", "-"]);
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("cannot attest: no repository data found"));
}

#[test]
fn failed_launch_leaves_no_output_file() {
    let dir = tempdir().unwrap();
    scripted_codebase(dir.path(), EVENTS);
    let output = dir.path().join("tests.intoto.json");

    let out = proctor(&["run", "-d", dir.path().to_str().unwrap(), "-o", output.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("cannot attest"));
    assert!(!output.exists());
}

#[test]
fn missing_work_dir_is_rejected() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let out = proctor(&["run", "-d", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("working directory does not exist"));
}

#[test]
fn doctor_lists_passed_checks() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(".proctor.toml"),
        "[output]\nattest = false\n[runner]\nkind = \"command\"\ncommand = \"true\"\n",
    )
    .unwrap();

    let out = proctor(&["doctor", dir.path().to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("work_dir"));
    assert!(stdout.contains("command:true"));
}
