// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Store adapters for real I/O

pub mod redis;
pub mod traced;

pub use self::redis::{RedisConnection, RedisStore, RedisSubscription};
pub use traced::{TracedConnection, TracedStore};
