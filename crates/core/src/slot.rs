// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot identifiers and lease stamps

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of one logical database on the shared server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Reserved for lease keys and the broadcast channel, never handed out
    pub const CONTROL: SlotId = SlotId(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn is_control(self) -> bool {
        self == Self::CONTROL
    }

    /// Slots a pool of `pool_size` databases can hand out, in scan order
    pub fn allocatable(pool_size: u32) -> impl Iterator<Item = SlotId> {
        (1..pool_size).map(SlotId)
    }

    /// Whether this slot can be handed out from a pool of `pool_size`
    pub fn is_allocatable(self, pool_size: u32) -> bool {
        !self.is_control() && self.0 < pool_size
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SlotId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SlotId)
    }
}

/// Value stored under a lease key: the acquisition time in RFC 3339
pub fn lease_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
