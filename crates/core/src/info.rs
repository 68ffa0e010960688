// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsers for the server's free-text introspection replies
//!
//! - [`parse_info`] turns an INFO report into a key/value map
//! - [`client_db`] finds a client's selected database in a CLIENT LIST reply

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static CLIENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^id=(\d+) .* db=(\d+) .*$").expect("constant regex pattern is valid")
});

/// Parse an INFO-style report into a key/value map.
///
/// Lines are trimmed; blank lines, single characters and `#` section headers
/// are skipped. Each remaining line is split on its first `:`, so values may
/// contain colons. Lines without a colon, or starting with one, are dropped.
/// A repeated key keeps the value from its last occurrence.
pub fn parse_info(text: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.len() < 2 || line.starts_with('#') {
            continue;
        }
        let Some(idx) = line.find(':') else {
            continue;
        };
        if idx == 0 {
            continue;
        }
        result.insert(
            line[..idx].trim().to_string(),
            line[idx + 1..].trim().to_string(),
        );
    }
    result
}

/// Find the database selected by client `client_id` in a CLIENT LIST reply.
///
/// Returns `None` when no line belongs to that client.
pub fn client_db(client_list: &str, client_id: i64) -> Option<u32> {
    client_list.lines().find_map(|line| {
        let caps = CLIENT_LINE.captures(line.trim_end_matches('\r'))?;
        let id: i64 = caps[1].parse().ok()?;
        if id != client_id {
            return None;
        }
        caps[2].parse().ok()
    })
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;
