// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot allocator: scan, lease, verify, wait
//!
//! 1. Scan slots `1..N` and take the first one whose lease can be created
//!    and which is empty. Dirty slots are un-leased and skipped.
//! 2. Nothing leasable and nothing held by anyone: fail, waiting cannot fix
//!    dirty slots.
//! 3. Otherwise wait for a broadcast naming a freed slot, re-scanning on a
//!    fixed period in case a broadcast was missed, until the deadline.
//!
//! The store's set-if-absent is the only arbitration between competing
//! processes; nothing here takes an in-process lock.

use crate::backoff::{deadline_after, RetryPolicy};
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lease::{LeaseAdapter, LockAttempt};
use crate::session::Session;
use crate::slot::SlotId;
use crate::store::{Store, StoreConnection, StoreError, Subscription};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Time setup and the first scan get even when the caller's timeout is
/// shorter
pub const MIN_SCAN_WINDOW: Duration = Duration::from_secs(1);

/// Floor for the rescan period while waiting for a release
pub const MIN_RESCAN_INTERVAL: Duration = Duration::from_millis(10);

/// Run one store round trip, failing with a pool timeout at `deadline`
async fn within<T, F>(deadline: Instant, timeout: Duration, call: F) -> Result<T, PoolError>
where
    F: Future<Output = Result<T, PoolError>>,
{
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| PoolError::Timeout { timeout })?
}

/// Hands out exclusively leased, verified-clean slots
#[derive(Clone)]
pub struct SlotAllocator<S: Store> {
    store: S,
    config: Arc<PoolConfig>,
}

impl<S: Store> SlotAllocator<S> {
    pub fn new(store: S, config: PoolConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Acquire a slot, waiting up to the configured `wait_timeout`
    pub async fn acquire(&self) -> Result<Session<S>, PoolError> {
        self.acquire_within(self.config.wait_timeout).await
    }

    /// Acquire a slot, waiting up to `timeout` for one to be released
    ///
    /// Every store round trip is bounded by the deadline, except that setup
    /// and the first scan always get [`MIN_SCAN_WINDOW`] so a zero timeout
    /// still tries once. A lease created by a call cut off at the deadline
    /// is left to expire through its TTL.
    pub async fn acquire_within(&self, timeout: Duration) -> Result<Session<S>, PoolError> {
        let start = Instant::now();
        let deadline = deadline_after(start, timeout);
        let scan_deadline = deadline.max(deadline_after(start, MIN_SCAN_WINDOW));

        let control = within(scan_deadline, timeout, async {
            self.store
                .connect(SlotId::CONTROL)
                .await
                .map_err(PoolError::store(SlotId::CONTROL))
        })
        .await?;
        let mut leases = LeaseAdapter::new(control, Arc::clone(&self.config));

        let pool_size = within(scan_deadline, timeout, async {
            leases.pool_size().await.map_err(PoolError::PoolSizeUnreadable)
        })
        .await?;
        if pool_size < 2 {
            return Err(PoolError::PoolTooSmall { pool_size });
        }

        // Subscribe first so a release racing with the scan is not missed
        let mut subscription = within(scan_deadline, timeout, async {
            self.store
                .subscribe(&self.config.channel)
                .await
                .map_err(PoolError::store(SlotId::CONTROL))
        })
        .await?;

        let found = within(scan_deadline, timeout, self.scan(&mut leases, pool_size)).await?;
        let slot = match found {
            Some(slot) => slot,
            None => {
                self.wait_for_release(&mut leases, &mut subscription, pool_size, deadline, timeout)
                    .await?
            }
        };
        drop(subscription);
        self.lifecycle(format_args!("number of databases: {pool_size}, chosen: {slot}"));

        let connect_deadline = deadline.max(deadline_after(Instant::now(), MIN_SCAN_WINDOW));
        let connected = within(connect_deadline, timeout, async {
            self.store.connect(slot).await.map_err(PoolError::store(slot))
        })
        .await;
        match connected {
            Ok(conn) => self.open_session(slot, conn).await,
            Err(e) => {
                let release_deadline = deadline_after(Instant::now(), MIN_SCAN_WINDOW);
                match tokio::time::timeout_at(release_deadline, leases.release(slot)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(release)) => {
                        tracing::error!(%slot, error = %release, "can't release lease after failed connect")
                    }
                    Err(_) => tracing::error!(%slot, "lease release after failed connect timed out"),
                }
                Err(e)
            }
        }
    }

    /// Run `f` with a fresh session and release it afterwards, whatever `f`
    /// returned
    pub async fn with_slot<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: for<'a> FnOnce(&'a mut Session<S>) -> Pin<Box<dyn Future<Output = T> + Send + 'a>>,
    {
        let mut session = self.acquire().await?;
        let value = f(&mut session).await;
        session.release().await?;
        Ok(value)
    }

    async fn open_session(
        &self,
        slot: SlotId,
        mut conn: S::Connection,
    ) -> Result<Session<S>, PoolError> {
        if self.config.debug {
            match conn.current_slot().await {
                Ok(current) if current == slot => {
                    tracing::info!(%slot, "returning connection on db {current}")
                }
                Ok(current) => {
                    tracing::warn!(%slot, %current, "connection reports a different db")
                }
                Err(e) => tracing::warn!(%slot, error = %e, "can't introspect connection"),
            }
        }
        Ok(Session::new(
            self.store.clone(),
            slot,
            conn,
            Arc::clone(&self.config),
        ))
    }

    /// One pass over every allocatable slot
    ///
    /// `Ok(None)` means every candidate is currently held by someone.
    async fn scan(
        &self,
        leases: &mut LeaseAdapter<S::Connection>,
        pool_size: u32,
    ) -> Result<Option<SlotId>, PoolError> {
        let mut found_locked = false;
        for slot in SlotId::allocatable(pool_size) {
            match leases.try_lock(slot).await.map_err(PoolError::store(slot))? {
                LockAttempt::Acquired => return Ok(Some(slot)),
                LockAttempt::Dirty => tracing::warn!(%slot, "skipping dirty slot"),
                LockAttempt::Held => found_locked = true,
            }
        }

        if !found_locked {
            return Err(PoolError::Exhausted { pool_size });
        }
        tracing::debug!(pool_size, "all slots held, waiting");
        Ok(None)
    }

    async fn wait_for_release(
        &self,
        leases: &mut LeaseAdapter<S::Connection>,
        subscription: &mut S::Subscription,
        pool_size: u32,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<SlotId, PoolError> {
        let interval = self.config.rescan_interval.max(MIN_RESCAN_INTERVAL);
        let mut rescan = RetryPolicy::fixed(interval).start(deadline);
        let Some(delay) = rescan.next_delay(Instant::now()) else {
            return Err(PoolError::Timeout { timeout });
        };
        let mut next_rescan = Instant::now() + delay;

        loop {
            tokio::select! {
                biased;

                _ = tokio::time::sleep_until(deadline) => {
                    return Err(PoolError::Timeout { timeout });
                }

                message = subscription.next_message() => {
                    let Some(payload) = message else {
                        return Err(PoolError::Store {
                            slot: SlotId::CONTROL,
                            source: StoreError::SubscriptionClosed,
                        });
                    };
                    let slot: SlotId = payload
                        .parse()
                        .map_err(|_| PoolError::InvalidBroadcast { payload: payload.clone() })?;
                    if !slot.is_allocatable(pool_size) {
                        tracing::warn!(%slot, pool_size, "ignoring broadcast for slot outside the pool");
                        continue;
                    }

                    let attempt = within(deadline, timeout, async {
                        leases.try_lock(slot).await.map_err(PoolError::store(slot))
                    })
                    .await?;
                    match attempt {
                        LockAttempt::Acquired => return Ok(slot),
                        LockAttempt::Dirty => return Err(PoolError::ProtocolViolation { slot }),
                        LockAttempt::Held => tracing::debug!(%slot, "released slot taken by another waiter"),
                    }
                }

                _ = tokio::time::sleep_until(next_rescan) => {
                    if let Some(slot) = within(deadline, timeout, self.scan(leases, pool_size)).await? {
                        return Ok(slot);
                    }
                    match rescan.next_delay(Instant::now()) {
                        Some(delay) => next_rescan = Instant::now() + delay,
                        None => return Err(PoolError::Timeout { timeout }),
                    }
                }
            }
        }
    }

    fn lifecycle(&self, message: std::fmt::Arguments<'_>) {
        if self.config.debug {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
    }
}

#[cfg(test)]
#[path = "allocator_tests.rs"]
mod tests;
