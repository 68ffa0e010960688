// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool configuration
//!
//! One immutable value built at startup and handed to the allocator and the
//! readiness waiter. Sources, lowest precedence first: defaults, a TOML file,
//! the `REDISADDR` environment variable, explicit `with_*` overrides.

use crate::slot::SlotId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Address used when neither the config file nor the environment names one
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Environment variable holding the server address
pub const ADDR_ENV: &str = "REDISADDR";

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// `host:port` of the shared server
    pub addr: String,
    /// Promote allocation lifecycle messages from debug to info
    pub debug: bool,
    /// How long `acquire` waits for a slot to free up
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,
    /// How long the readiness waiter polls before giving up
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,
    /// Expiry of a lease key; bounds how long a crashed holder blocks a slot
    #[serde(with = "humantime_serde")]
    pub lease_ttl: Duration,
    /// Full re-scan period while waiting, covers missed broadcasts
    #[serde(with = "humantime_serde")]
    pub rescan_interval: Duration,
    /// Pub/sub channel carrying released slot indexes
    pub channel: String,
    /// Lease keys are `<key_prefix><slot>` in the control slot
    pub key_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            debug: false,
            wait_timeout: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(5),
            lease_ttl: Duration::from_secs(20 * 60),
            rescan_interval: Duration::from_secs(5),
            channel: "redis-test-broadcast".to_string(),
            key_prefix: "redis-test-".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `REDISADDR` applied
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Parse a TOML document; absent fields keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the allocator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rescan_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "rescan_interval",
                reason: "must be greater than zero",
            });
        }
        if self.lease_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                field: "lease_ttl",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Override `addr` from `REDISADDR` when it is set and non-empty
    pub fn apply_env(self) -> Self {
        self.with_env_addr(std::env::var(ADDR_ENV).ok())
    }

    pub fn with_env_addr(self, value: Option<String>) -> Self {
        match value {
            Some(addr) if !addr.trim().is_empty() => self.with_addr(addr.trim()),
            _ => self,
        }
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Lease key guarding `slot`
    pub fn lease_key(&self, slot: SlotId) -> String {
        format!("{}{}", self.key_prefix, slot)
    }

    /// Connection URL selecting `slot` on the configured server
    pub fn slot_url(&self, slot: SlotId) -> String {
        slot_url(&self.addr, slot)
    }
}

/// `redis://<addr>/<slot>`; an address that already carries a scheme keeps it
pub fn slot_url(addr: &str, slot: SlotId) -> String {
    let base = addr.trim_end_matches('/');
    if base.contains("://") {
        format!("{}/{}", base, slot)
    } else {
        format!("redis://{}/{}", base, slot)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
