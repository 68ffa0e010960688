// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fmt;

#[derive(Serialize)]
struct Ready {
    addr: &'static str,
}

impl fmt::Display for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redis at {} is ready", self.addr)
    }
}

#[test]
fn text_uses_display() {
    let value = Ready { addr: "cache:6379" };
    assert_eq!(render(&value, OutputFormat::Text), "redis at cache:6379 is ready");
}

#[test]
fn json_uses_serialize() {
    let value = Ready { addr: "cache:6379" };
    assert_eq!(
        render(&value, OutputFormat::Json),
        "{\n  \"addr\": \"cache:6379\"\n}"
    );
}
