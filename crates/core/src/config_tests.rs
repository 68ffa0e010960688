// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use yare::parameterized;

#[test]
fn defaults_match_documented_values() {
    let config = PoolConfig::default();
    assert_eq!(config.addr, "127.0.0.1:6379");
    assert!(!config.debug);
    assert_eq!(config.wait_timeout, Duration::from_secs(60));
    assert_eq!(config.ready_timeout, Duration::from_secs(5));
    assert_eq!(config.lease_ttl, Duration::from_secs(1200));
    assert_eq!(config.rescan_interval, Duration::from_secs(5));
    assert_eq!(config.channel, "redis-test-broadcast");
}

#[test]
fn lease_key_embeds_slot_index() {
    let config = PoolConfig::default();
    assert_eq!(config.lease_key(SlotId(3)), "redis-test-3");
    assert_eq!(
        config.with_key_prefix("ci-lock:").lease_key(SlotId(12)),
        "ci-lock:12"
    );
}

#[parameterized(
    unset = { None, "127.0.0.1:6379" },
    empty = { Some(""), "127.0.0.1:6379" },
    blank = { Some("  "), "127.0.0.1:6379" },
    set = { Some("redis.internal:6380"), "redis.internal:6380" },
)]
fn env_address_overrides_when_present(value: Option<&str>, expected: &str) {
    let config = PoolConfig::default().with_env_addr(value.map(String::from));
    assert_eq!(config.addr, expected);
}

#[parameterized(
    bare = { "localhost:6379", 2, "redis://localhost:6379/2" },
    with_scheme = { "redis://localhost:6379", 5, "redis://localhost:6379/5" },
    trailing_slash = { "rediss://cache:6380/", 1, "rediss://cache:6380/1" },
)]
fn builds_slot_urls(addr: &str, slot: u32, expected: &str) {
    assert_eq!(slot_url(addr, SlotId(slot)), expected);
}

#[test]
fn toml_overrides_selected_fields() {
    let config = PoolConfig::from_toml_str(
        r#"
addr = "10.0.0.5:6379"
debug = true
wait_timeout = "2m 30s"
lease_ttl = "5m"
"#,
    )
    .unwrap();

    assert_eq!(config.addr, "10.0.0.5:6379");
    assert!(config.debug);
    assert_eq!(config.wait_timeout, Duration::from_secs(150));
    assert_eq!(config.lease_ttl, Duration::from_secs(300));
    assert_eq!(config.ready_timeout, Duration::from_secs(5));
    assert_eq!(config.channel, "redis-test-broadcast");
}

#[test]
fn toml_rejects_unknown_fields() {
    let err = PoolConfig::from_toml_str("adress = \"x\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[parameterized(
    rescan = { "rescan_interval = \"0s\"", "rescan_interval" },
    lease = { "lease_ttl = \"0s\"", "lease_ttl" },
)]
fn toml_rejects_zero_durations(text: &str, field: &str) {
    let err = PoolConfig::from_toml_str(text).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: f, .. } if f == field));
    assert!(err.to_string().starts_with("invalid config"));
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "rescan_interval = \"250ms\"").unwrap();

    let config = PoolConfig::load(file.path()).unwrap();
    assert_eq!(config.rescan_interval, Duration::from_millis(250));
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = PoolConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
