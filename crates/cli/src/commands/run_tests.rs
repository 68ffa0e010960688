// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    success = { Some(0), 0 },
    failure = { Some(1), 1 },
    custom = { Some(42), 42 },
    out_of_range = { Some(300), 1 },
    negative = { Some(-1), 1 },
    signalled = { None, 1 },
)]
fn child_exit_code_is_passed_through(code: Option<i32>, expected: u8) {
    assert_eq!(child_exit_code(code), expected);
}
