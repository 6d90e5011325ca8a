//! Integration tests for the parex CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn parex() -> Command {
    let mut cmd = Command::cargo_bin("parex").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("PAREX_CONFIG");
    cmd
}

fn sorted_lines(bytes: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

/// Test CLI binary exists and responds to -h / --help
#[test]
fn test_cli_help() {
    parex()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run a command for every line of input"));

    parex()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("runs COMMAND once per record"))
        .stdout(predicate::str::contains("--template"));
}

/// Test CLI responds to --version
#[test]
fn test_cli_version() {
    parex()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("parex"));
}

#[test]
fn test_missing_command_is_a_usage_error() {
    parex()
        .write_stdin("a\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Must specify a command to execute"));
}

#[test]
fn test_unknown_program_fails_before_reading_input() {
    parex()
        .arg("parex-no-such-program")
        .write_stdin("a\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not find program `parex-no-such-program`"));
}

#[test]
fn test_invalid_template_fails_at_startup() {
    parex()
        .args(["-t", "echo {{ Input"])
        .write_stdin("a\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid command template"));
}

#[cfg(unix)]
#[test]
fn test_runs_command_per_line() {
    let assert = parex()
        .args(["-j", "2", "echo", "got"])
        .write_stdin("a\nb\nc\n")
        .assert()
        .success();

    assert_eq!(
        sorted_lines(&assert.get_output().stdout),
        vec!["got a", "got b", "got c"]
    );
}

#[cfg(unix)]
#[test]
fn test_template_mode() {
    let assert = parex()
        .args(["-j", "1", "-t", "echo {{ Input | toUpper }} {{ ext(Input) }}"])
        .write_stdin("notes.txt\n")
        .assert()
        .success();

    assert_eq!(String::from_utf8_lossy(&assert.get_output().stdout), "NOTES.TXT .txt\n");
}

#[cfg(unix)]
#[test]
fn test_null_delimiter() {
    parex()
        .args(["-0", "-j", "1", "printf", "[%s]"])
        .write_stdin("one two\0three")
        .assert()
        .success()
        .stdout("[one two][three]");
}

#[cfg(unix)]
#[test]
fn test_arg_file_replaces_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let arg_file = temp_dir.path().join("records.txt");
    fs::write(&arg_file, "from-file\n").unwrap();

    parex()
        .arg("-a")
        .arg(&arg_file)
        .arg("echo")
        .write_stdin("from-stdin\n")
        .assert()
        .success()
        .stdout("from-file\n");
}

#[test]
fn test_unreadable_arg_file_is_fatal() {
    parex()
        .args(["-a", "/definitely/not/here.txt", "-t", "echo {{ Input }}"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read from input"));
}

#[cfg(unix)]
#[test]
fn test_failed_record_is_reported_and_others_still_run() {
    let assert = parex()
        .args(["-j", "3", "-t", "sh -c 'test {{ Input }} != bad && echo {{ Input }}'"])
        .write_stdin("good\nbad\nalso-good\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to run command `sh -c test bad != bad && echo bad`"));

    assert_eq!(
        sorted_lines(&assert.get_output().stdout),
        vec!["also-good", "good"]
    );
}

#[cfg(unix)]
#[test]
fn test_config_file_sets_delimiter() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("parex.toml");
    fs::write(&config, "[pool]\njobs = 1\nnull = true\n").unwrap();

    parex()
        .arg("--config")
        .arg(&config)
        .args(["printf", "<%s>"])
        .write_stdin("a\nb\0c")
        .assert()
        .success()
        .stdout("<a\nb><c>");
}

#[cfg(unix)]
#[test]
fn test_environment_overrides_config() {
    let temp_dir = TempDir::new().unwrap();

    parex()
        .current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env("PAREX_POOL__NULL", "true")
        .env("PAREX_POOL__JOBS", "1")
        .args(["printf", "<%s>"])
        .write_stdin("x\0y")
        .assert()
        .success()
        .stdout("<x><y>");
}

#[test]
fn test_zero_jobs_rejected() {
    parex()
        .args(["-j", "0", "-t", "echo {{ Input }}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0"));
}
