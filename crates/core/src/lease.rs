// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease vocabulary over a control-slot connection
//!
//! A lease is a key in the control slot created with set-if-absent and an
//! expiry. Its existence is the only proof that a slot is owned; its absence
//! says nothing about whether the slot is clean.

use crate::config::PoolConfig;
use crate::slot::{lease_stamp, SlotId};
use crate::store::{StoreConnection, StoreError};
use std::sync::Arc;

/// Outcome of trying to take a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockAttempt {
    /// Lease created and the slot is empty: it is ours
    Acquired,
    /// Lease created but the slot holds data; the lease was dropped again
    Dirty,
    /// Someone else holds the lease
    Held,
}

/// Lease operations on a connection that has the control slot selected
pub struct LeaseAdapter<C> {
    conn: C,
    config: Arc<PoolConfig>,
}

impl<C: StoreConnection> LeaseAdapter<C> {
    /// Wrap `conn`, which must currently have the control slot selected
    pub fn new(conn: C, config: Arc<PoolConfig>) -> Self {
        Self { conn, config }
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Number of databases the server is configured with
    pub async fn pool_size(&mut self) -> Result<u32, StoreError> {
        const PARAM: &str = "databases";
        let reply = self.conn.config_get(PARAM).await?;
        let [name, value] = reply.as_slice() else {
            return Err(StoreError::unexpected(
                "CONFIG GET",
                format!("expected 2 values, got {}", reply.len()),
            ));
        };
        if name != PARAM {
            return Err(StoreError::unexpected(
                "CONFIG GET",
                format!("parameter {:?}, expected {:?}", name, PARAM),
            ));
        }
        value
            .trim()
            .parse::<u16>()
            .map(u32::from)
            .map_err(|e| StoreError::unexpected("CONFIG GET", format!("{:?}: {}", value, e)))
    }

    /// Create the lease for `slot`; `false` if it is already held
    pub async fn try_acquire(&mut self, slot: SlotId) -> Result<bool, StoreError> {
        let key = self.config.lease_key(slot);
        let stamp = lease_stamp(chrono::Utc::now());
        self.conn
            .set_if_absent(&key, &stamp, self.config.lease_ttl)
            .await
    }

    /// Whether `slot` holds no keys. The connection is back on the control
    /// slot when this returns `Ok`.
    pub async fn is_clean(&mut self, slot: SlotId) -> Result<bool, StoreError> {
        self.conn.select(slot).await?;
        let empty = self.conn.is_empty().await?;
        self.conn.select(SlotId::CONTROL).await?;
        Ok(empty)
    }

    /// Lease then verify: the scan step shared by the fast scan and the
    /// broadcast handler. A dirty slot's lease is deleted before returning.
    pub async fn try_lock(&mut self, slot: SlotId) -> Result<LockAttempt, StoreError> {
        if !self.try_acquire(slot).await? {
            return Ok(LockAttempt::Held);
        }
        if self.is_clean(slot).await? {
            return Ok(LockAttempt::Acquired);
        }
        self.release(slot).await?;
        Ok(LockAttempt::Dirty)
    }

    /// Delete the lease for `slot`
    pub async fn release(&mut self, slot: SlotId) -> Result<(), StoreError> {
        let key = self.config.lease_key(slot);
        self.conn.delete(&key).await
    }

    /// Announce that `slot` is free
    pub async fn broadcast(&mut self, slot: SlotId) -> Result<(), StoreError> {
        self.conn
            .publish(&self.config.channel, &slot.to_string())
            .await
    }

    /// Stamp stored in the lease for `slot`, if one is held
    pub async fn holder(&mut self, slot: SlotId) -> Result<Option<String>, StoreError> {
        let key = self.config.lease_key(slot);
        self.conn.get(&key).await
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
