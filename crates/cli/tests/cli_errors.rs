// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for failures that need no Redis server
//!
//! Every test points the binary at a port nothing listens on.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

/// `host:port` with nothing listening on it
fn closed_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

fn redislot() -> Command {
    let mut cmd = Command::cargo_bin("redislot").unwrap();
    cmd.env_remove("REDISADDR").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    redislot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_wait_times_out_on_closed_port() {
    let addr = closed_addr();
    redislot()
        .args(["--addr", &addr, "wait", "--timeout", "300ms"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("store not ready after 300ms in socket phase"))
        .stderr(predicate::str::contains("suggestions:"));
}

#[test]
fn test_wait_reads_address_from_env() {
    let addr = closed_addr();
    redislot()
        .env("REDISADDR", &addr)
        .args(["wait", "--timeout", "200ms"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(&addr));
}

#[test]
fn test_run_requires_command() {
    redislot()
        .args(["run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_run_without_wait_fails_on_closed_port() {
    let addr = closed_addr();
    redislot()
        .args(["--addr", &addr, "run", "--no-wait", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("connection failed"));
}

#[test]
fn test_status_fails_on_closed_port() {
    let addr = closed_addr();
    redislot()
        .args(["--addr", &addr, "status", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("redislot wait"));
}

#[test]
fn test_bad_config_file_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pool.toml");
    fs::write(&path, "wait_timeout = \"soon\"\n").unwrap();

    redislot()
        .args(["--config", path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading config from"))
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.toml");

    redislot()
        .args(["--config", path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn test_unknown_format_is_usage_error() {
    redislot()
        .args(["status", "--format", "yaml"])
        .assert()
        .code(2);
}
