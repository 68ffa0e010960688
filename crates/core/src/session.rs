// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session handle bound to one leased, verified-clean slot
//!
//! Release runs flush, select control slot, delete lease, publish, close.
//! Every step is attempted even when an earlier one failed, except that
//! nothing after the control-slot switch can run without it.

use crate::config::PoolConfig;
use crate::error::{CleanupFailure, CleanupStep, ReleaseError};
use crate::lease::LeaseAdapter;
use crate::slot::SlotId;
use crate::store::{Store, StoreConnection};
use std::sync::Arc;

/// Exclusive use of one slot until released
///
/// Call [`Session::release`] when done. A session dropped without release
/// runs the same cleanup on a fresh connection in a background task.
pub struct Session<S: Store> {
    slot: SlotId,
    conn: S::Connection,
    guard: ReleaseGuard<S>,
}

impl<S: Store> Session<S> {
    pub(crate) fn new(
        store: S,
        slot: SlotId,
        conn: S::Connection,
        config: Arc<PoolConfig>,
    ) -> Self {
        Self {
            slot,
            conn,
            guard: ReleaseGuard {
                store,
                slot,
                config,
                armed: true,
            },
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Connection with this session's slot selected
    pub fn connection(&mut self) -> &mut S::Connection {
        &mut self.conn
    }

    /// URL that opens further connections on this slot
    pub fn url(&self) -> String {
        self.guard.config.slot_url(self.slot)
    }

    /// Flush the slot, drop its lease and announce it free
    pub async fn release(self) -> Result<(), ReleaseError> {
        let Session {
            slot,
            conn,
            mut guard,
        } = self;
        guard.armed = false;
        log_release(&guard.config, slot);
        cleanup(conn, slot, Arc::clone(&guard.config)).await
    }
}

impl<S: Store> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("slot", &self.slot).finish()
    }
}

fn log_release(config: &PoolConfig, slot: SlotId) {
    if config.debug {
        tracing::info!(%slot, "releasing slot");
    } else {
        tracing::debug!(%slot, "releasing slot");
    }
}

/// Run the release sequence on `conn`, which has `slot` selected
pub(crate) async fn cleanup<C: StoreConnection>(
    mut conn: C,
    slot: SlotId,
    config: Arc<PoolConfig>,
) -> Result<(), ReleaseError> {
    let mut failures = Vec::new();

    // Lease deletion must still run if this fails
    if let Err(source) = conn.flush().await {
        tracing::error!(%slot, error = %source, "can't flush slot");
        failures.push(CleanupFailure {
            step: CleanupStep::Flush,
            source,
        });
    }

    if let Err(source) = conn.select(SlotId::CONTROL).await {
        tracing::error!(%slot, error = %source, "can't select control slot, lease left to expire");
        return Err(ReleaseError::Aborted {
            slot,
            source,
            earlier: failures,
        });
    }

    let mut leases = LeaseAdapter::new(conn, config);
    if let Err(source) = leases.release(slot).await {
        tracing::error!(%slot, error = %source, "can't delete lease");
        failures.push(CleanupFailure {
            step: CleanupStep::DeleteLease,
            source,
        });
    }
    if let Err(source) = leases.broadcast(slot).await {
        tracing::error!(%slot, error = %source, "can't publish release");
        failures.push(CleanupFailure {
            step: CleanupStep::Publish,
            source,
        });
    }
    drop(leases);

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReleaseError::Incomplete { slot, failures })
    }
}

/// Fires the release sequence when a session is dropped unreleased
struct ReleaseGuard<S: Store> {
    store: S,
    slot: SlotId,
    config: Arc<PoolConfig>,
    armed: bool,
}

impl<S: Store> Drop for ReleaseGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let slot = self.slot;
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                %slot,
                ttl = ?self.config.lease_ttl,
                "session dropped outside a runtime, lease left to expire"
            );
            return;
        };

        tracing::warn!(%slot, "session dropped without release, cleaning up in background");
        let store = self.store.clone();
        let config = Arc::clone(&self.config);
        handle.spawn(async move {
            let conn = match store.connect(slot).await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(%slot, error = %e, "can't open cleanup connection");
                    return;
                }
            };
            if let Err(e) = cleanup(conn, slot, config).await {
                tracing::error!(%slot, error = %e, "background release failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
