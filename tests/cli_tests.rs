//! Black-box tests of the `gavel` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

fn valid_config(dir: &tempfile::TempDir) -> String {
    format!(
        r#"
[chain]
rpc_url = "http://localhost:8545"
contract_address = "0x0101010101010101010101010101010101010101"
chain_id = 31337

[backend]
base_url = "http://localhost:3000"

[settlement]
reward_per_winner = 100

[database]
path = "{}"
"#,
        dir.path().join("gavel.db").display()
    )
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("gavel")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn run_requires_an_auction_id() {
    Command::cargo_bin("gavel")
        .unwrap()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--auction"));
}

#[test]
fn run_fails_with_exit_1_on_missing_config() {
    Command::cargo_bin("gavel")
        .unwrap()
        .args(["run", "--config", "/nonexistent/config.toml", "--auction", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn run_fails_with_exit_1_on_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[chain]
rpc_url = "not a url"
contract_address = "0x0101010101010101010101010101010101010101"
chain_id = 31337

[backend]
base_url = "http://localhost:3000"

[settlement]
reward_per_winner = 100
"#,
    );

    Command::cargo_bin("gavel")
        .unwrap()
        .args(["run", "--config"])
        .arg(&path)
        .args(["--auction", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("rpc_url"));
}

#[test]
fn status_reports_when_no_run_was_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = valid_config(&dir);
    let path = write_config(&dir, &config);

    Command::cargo_bin("gavel")
        .unwrap()
        .env_remove("GAVEL_PRIVATE_KEY")
        .args(["status", "--config"])
        .arg(&path)
        .args(["--auction", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no settlement run recorded"));
}
