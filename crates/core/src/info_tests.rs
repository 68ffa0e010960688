// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

const PERSISTENCE_LOADING: &str = "
# Persistence
loading:1
rdb_changes_since_last_save:0
rdb_bgsave_in_progress:0
rdb_last_save_time:1603112806
rdb_last_bgsave_status:ok
rdb_last_bgsave_time_sec:-1
aof_enabled:0
loading_start_time:1603112806
loading_total_bytes:40133580
loading_loaded_bytes:2094393
loading_loaded_perc:5.22
loading_eta_seconds:1
";

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn parses_persistence_section() {
    let parsed = parse_info(PERSISTENCE_LOADING);
    assert_eq!(
        parsed,
        map(&[
            ("loading", "1"),
            ("rdb_changes_since_last_save", "0"),
            ("rdb_bgsave_in_progress", "0"),
            ("rdb_last_save_time", "1603112806"),
            ("rdb_last_bgsave_status", "ok"),
            ("rdb_last_bgsave_time_sec", "-1"),
            ("aof_enabled", "0"),
            ("loading_start_time", "1603112806"),
            ("loading_total_bytes", "40133580"),
            ("loading_loaded_bytes", "2094393"),
            ("loading_loaded_perc", "5.22"),
            ("loading_eta_seconds", "1"),
        ])
    );
}

#[test]
fn parses_multiple_sections_and_crlf() {
    let text = "# Server\r\nredis_version:6.0.8\r\nos:Darwin 19.6.0 x86_64\r\n\r\n# Keyspace\r\ndb0:keys=8,expires=0,avg_ttl=0\r\n";
    let parsed = parse_info(text);
    assert_eq!(
        parsed,
        map(&[
            ("redis_version", "6.0.8"),
            ("os", "Darwin 19.6.0 x86_64"),
            ("db0", "keys=8,expires=0,avg_ttl=0"),
        ])
    );
}

#[test]
fn splits_on_first_colon_only() {
    let parsed = parse_info("loading:1\nfoo:bar:baz\n");
    assert_eq!(parsed, map(&[("loading", "1"), ("foo", "bar:baz")]));
}

#[test]
fn trims_and_skips_comments_and_blanks() {
    let parsed = parse_info("# comment\n\nkey: value \n");
    assert_eq!(parsed, map(&[("key", "value")]));
}

#[test]
fn last_duplicate_wins() {
    let parsed = parse_info("loading:1\nloading:0\n");
    assert_eq!(parsed, map(&[("loading", "0")]));
}

#[parameterized(
    empty = { "" },
    single_char = { "x" },
    comment = { "#loading:1" },
    no_colon = { "loading" },
    leading_colon = { ":loading" },
    whitespace_only = { "    " },
)]
fn malformed_lines_contribute_nothing(line: &str) {
    assert!(parse_info(line).is_empty());
}

#[test]
fn empty_value_is_kept() {
    let parsed = parse_info("name:\n");
    assert_eq!(parsed, map(&[("name", "")]));
}

const CLIENT_LIST: &str = "id=3 addr=127.0.0.1:51234 laddr=127.0.0.1:6379 fd=8 name= age=10 idle=0 flags=N db=0 sub=0 psub=0 cmd=client|list\n\
id=7 addr=127.0.0.1:51240 laddr=127.0.0.1:6379 fd=9 name= age=2 idle=0 flags=N db=4 sub=0 psub=0 cmd=client|list\n";

#[parameterized(
    first_client = { 3, Some(0) },
    second_client = { 7, Some(4) },
    unknown_client = { 42, None },
)]
fn finds_client_db(client_id: i64, expected: Option<u32>) {
    assert_eq!(client_db(CLIENT_LIST, client_id), expected);
}

#[test]
fn client_db_ignores_unrelated_lines() {
    assert_eq!(client_db("garbage\n\nid=x db=1 \n", 1), None);
}

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_]{1,8}:[ a-z0-9:.,=-]{0,12}",
        "#[ a-z:]{0,10}",
        "[a-z ]{0,6}",
        ":[a-z]{0,5}",
    ]
}

proptest! {
    #[test]
    fn reserialized_output_parses_to_itself(lines in prop::collection::vec(line_strategy(), 0..20)) {
        let text = lines.join("\n");
        let parsed = parse_info(&text);
        let reserialized: String = parsed
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();
        prop_assert_eq!(parse_info(&reserialized), parsed);
    }

    #[test]
    fn keys_only_come_from_wellformed_lines(lines in prop::collection::vec(line_strategy(), 0..20)) {
        let text = lines.join("\n");
        let parsed = parse_info(&text);
        for key in parsed.keys() {
            let source = lines.iter().map(|l| l.trim()).find(|l| {
                l.len() >= 2
                    && !l.starts_with('#')
                    && matches!(l.find(':'), Some(i) if i > 0 && l[..i].trim() == key.as_str())
            });
            prop_assert!(source.is_some(), "key {:?} has no well-formed source line", key);
        }
    }
}
