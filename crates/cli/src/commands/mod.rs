// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod run;
pub mod status;
pub mod wait;

use redislot_adapters::{RedisStore, TracedStore};
use redislot_core::PoolConfig;

/// Store every command talks to
pub fn store(config: &PoolConfig) -> TracedStore<RedisStore> {
    TracedStore::new(RedisStore::from_config(config))
}
