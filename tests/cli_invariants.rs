//! CLI Invariant Tests
//!
//! Runs the docgate binary end to end:
//! - stdout carries exactly one JSON response line
//! - log lines go to stderr, at every log level

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};
use tempfile::TempDir;

fn write_fixtures(dir: &Path, log_level: &str) -> PathBuf {
    let models = dir.join("models");
    fs::create_dir_all(&models).unwrap();
    fs::write(
        models.join("users.json"),
        json!({
            "name": "users",
            "required": ["email"],
            "formats": [
                { "path": "email", "type": "email" },
                { "path": "color", "type": "rgb" }
            ],
            "unique": ["email"]
        })
        .to_string(),
    )
    .unwrap();

    let config_path = dir.join("docgate.json");
    fs::write(
        &config_path,
        json!({
            "models_dir": models.to_string_lossy(),
            "log_level": log_level
        })
        .to_string(),
    )
    .unwrap();
    config_path
}

fn run_docgate(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_docgate"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("docgate should start");

    // Commands that fail before reading stdin close the pipe early
    let mut pipe = child.stdin.take().expect("stdin should be piped");
    let _ = pipe.write_all(stdin.as_bytes());
    drop(pipe);

    child.wait_with_output().expect("docgate should exit")
}

fn stdout_lines(output: &Output) -> Vec<Value> {
    String::from_utf8(output.stdout.clone())
        .expect("stdout should be utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("every stdout line is JSON"))
        .collect()
}

#[test]
fn test_validate_stdout_is_single_response_line() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_fixtures(temp_dir.path(), "trace");

    let output = run_docgate(
        &["validate", "--config", config.to_str().unwrap(), "--model", "users"],
        "{\"document\":{\"email\":\"A@b.co\"},\"context\":{\"isNewRecord\":true}}\n",
    );

    assert!(
        output.status.success(),
        "validate failed with stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "ok");
    assert_eq!(lines[0]["data"]["valid"], true);
    assert_eq!(lines[0]["data"]["normalized"]["email"], "a@b.co");
    assert!(lines[0].get("event").is_none());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"event\":\"CONFIG_LOADED\""));
    assert!(stderr.contains("\"event\":\"MODEL_WARNING\""));
}

#[test]
fn test_check_stdout_is_single_response_line() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_fixtures(temp_dir.path(), "info");

    let output = run_docgate(&["check", "--config", config.to_str().unwrap()], "");
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["data"]["models"], json!(["users"]));
}

#[test]
fn test_malformed_document_is_single_error_line() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_fixtures(temp_dir.path(), "info");

    let output = run_docgate(
        &["normalize", "--config", config.to_str().unwrap(), "--model", "users"],
        "{\"document\":[1,2]}\n",
    );
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "error");
    assert_eq!(lines[0]["code"], "DOCGATE_MALFORMED_DOCUMENT");
}

#[test]
fn test_unknown_model_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_fixtures(temp_dir.path(), "info");

    let output = run_docgate(
        &["validate", "--config", config.to_str().unwrap(), "--model", "ghosts"],
        "{\"document\":{}}\n",
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
