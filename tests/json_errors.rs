use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

fn json_error_code(assert: &assert_cmd::assert::Assert) -> String {
    let out = assert.get_output();
    assert_eq!(out.status.success(), false);
    let stdout = String::from_utf8_lossy(&out.stdout);
    let line = stdout.lines().last().expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid json error");
    assert!(v.get("message").is_some());
    v["code"].as_str().unwrap().to_string()
}

fn csv2tana(temp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("csv2tana").unwrap();
    cmd.current_dir(temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env_remove("TANA_API_TOKEN");
    cmd
}

#[test]
fn convert_missing_file_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = csv2tana(&temp).args(["convert", "--file", "missing.csv", "--json"]).assert();
    assert_eq!(json_error_code(&assert), "file_not_found");
}

#[test]
fn convert_empty_csv_json_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("empty.csv"), "").unwrap();
    let assert = csv2tana(&temp).args(["convert", "--file", "empty.csv", "--json"]).assert();
    assert_eq!(json_error_code(&assert), "missing_input");
}

#[test]
fn convert_header_only_json_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("header.csv"), "Name,Tags\n").unwrap();
    let assert = csv2tana(&temp).args(["convert", "--file", "header.csv", "--json"]).assert();
    assert_eq!(json_error_code(&assert), "missing_input");
}

#[test]
fn sync_without_token_json_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("data.csv"), "Name,Tags\nAlice,x\n").unwrap();
    let assert = csv2tana(&temp).args(["sync", "--file", "data.csv", "--json"]).assert();
    assert_eq!(json_error_code(&assert), "missing_token");
}

#[test]
fn sync_unreachable_endpoint_json_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("data.csv"), "Name,Tags\nAlice,x\n").unwrap();
    let assert = csv2tana(&temp)
        .args([
            "sync",
            "--file",
            "data.csv",
            "--token",
            "test-token",
            "--endpoint",
            "http://127.0.0.1:9/addToNodeV2",
            "--timeout",
            "5",
            "--json",
        ])
        .assert();
    assert_eq!(json_error_code(&assert), "network_error");
}

#[test]
fn convert_zero_max_chars_json_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("data.csv"), "Name\nAlice\n").unwrap();
    let assert = csv2tana(&temp).args(["convert", "--file", "data.csv", "--max-chars", "0", "--json"]).assert();
    assert_eq!(json_error_code(&assert), "invalid_args");
}
