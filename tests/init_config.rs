use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn init_writes_config_to_xdg_config_home() {
    let temp = tempfile::tempdir().unwrap();
    let xdg_config_home = temp.path().join(".config");
    std::fs::create_dir_all(&xdg_config_home).unwrap();

    let mut cmd = Command::cargo_bin("csv2tana").unwrap();
    cmd.env("XDG_CONFIG_HOME", &xdg_config_home)
        .env("TANA_API_TOKEN", "SECRET_TOKEN")
        .args([
            "init",
            "--delimiter",
            ";",
            "--request-delay-ms",
            "1500",
            "--profile",
            "work",
        ]);
    cmd.assert().success().stdout(contains("config written:"));

    let cfg_path = xdg_config_home.join("csv2tana").join("config.toml");
    let contents = std::fs::read_to_string(cfg_path).unwrap();
    assert!(contents.contains("default_profile = \"work\""));
    assert!(contents.contains("[profiles.work]"));
    assert!(contents.contains("addToNodeV2"));
    assert!(contents.contains("request_delay_ms = 1500"));
    assert!(contents.contains("max_nodes_per_batch = 100"));
    assert!(!contents.contains("SECRET_TOKEN"));
}

#[test]
fn init_rejects_fast_request_delay() {
    let temp = tempfile::tempdir().unwrap();
    let xdg_config_home = temp.path().join(".config");

    let mut cmd = Command::cargo_bin("csv2tana").unwrap();
    let assert = cmd
        .env("XDG_CONFIG_HOME", &xdg_config_home)
        .args(["init", "--request-delay-ms", "200"])
        .assert();
    assert.failure().stderr(contains("invalid --request-delay-ms"));
    assert!(!xdg_config_home.join("csv2tana").join("config.toml").exists());
}
