// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrappers for consistent observability

use async_trait::async_trait;
use redislot_core::{ClientIntrospection, SlotId, Store, StoreConnection, StoreError};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any Store
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    type Connection = TracedConnection<S::Connection>;
    type Subscription = S::Subscription;

    async fn connect(&self, slot: SlotId) -> Result<Self::Connection, StoreError> {
        let span = tracing::info_span!("store.connect", %slot);
        async {
            let start = Instant::now();
            let result = self.inner.connect(slot).await;
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms = elapsed_ms(start), "connected"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "connect failed"
                ),
            }
            result.map(|inner| TracedConnection { inner, slot })
        }
        .instrument(span)
        .await
    }

    async fn subscribe(&self, channel: &str) -> Result<Self::Subscription, StoreError> {
        let span = tracing::info_span!("store.subscribe", channel);
        async {
            let result = self.inner.subscribe(channel).await;
            match &result {
                Ok(_) => tracing::debug!("subscribed"),
                Err(e) => tracing::error!(error = %e, "subscribe failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any StoreConnection
pub struct TracedConnection<C> {
    inner: C,
    slot: SlotId,
}

impl<C> TracedConnection<C> {
    pub fn new(inner: C, slot: SlotId) -> Self {
        Self { inner, slot }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: StoreConnection> StoreConnection for TracedConnection<C> {
    async fn select(&mut self, slot: SlotId) -> Result<(), StoreError> {
        let result = observe(self.slot, "SELECT", self.inner.select(slot)).await;
        if result.is_ok() {
            tracing::debug!(from = %self.slot, to = %slot, "selected");
            self.slot = slot;
        }
        result
    }

    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let created = observe(self.slot, "SET", self.inner.set_if_absent(key, value, ttl)).await?;
        tracing::debug!(key, created, "set if absent");
        Ok(created)
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        observe(self.slot, "GET", self.inner.get(key)).await
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        observe(self.slot, "DEL", self.inner.delete(key)).await?;
        tracing::debug!(key, "deleted");
        Ok(())
    }

    async fn is_empty(&mut self) -> Result<bool, StoreError> {
        let empty = observe(self.slot, "RANDOMKEY", self.inner.is_empty()).await?;
        tracing::debug!(slot = %self.slot, empty, "checked");
        Ok(empty)
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        observe(self.slot, "FLUSHDB", self.inner.flush()).await?;
        tracing::info!(slot = %self.slot, "flushed");
        Ok(())
    }

    async fn publish(&mut self, channel: &str, message: &str) -> Result<(), StoreError> {
        observe(self.slot, "PUBLISH", self.inner.publish(channel, message)).await?;
        tracing::debug!(channel, message, "published");
        Ok(())
    }

    async fn config_get(&mut self, parameter: &str) -> Result<Vec<String>, StoreError> {
        observe(self.slot, "CONFIG GET", self.inner.config_get(parameter)).await
    }

    async fn info(&mut self, section: &str) -> Result<String, StoreError> {
        observe(self.slot, "INFO", self.inner.info(section)).await
    }

    async fn introspect(&mut self) -> Result<ClientIntrospection, StoreError> {
        observe(self.slot, "CLIENT", self.inner.introspect()).await
    }
}

/// Run one store command inside a span, logging failures with their timing
async fn observe<T, F>(slot: SlotId, op: &'static str, command: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let span = tracing::debug_span!("store.command", op, %slot);
    async move {
        let start = Instant::now();
        let result = command.await;
        match &result {
            Ok(_) => tracing::trace!(elapsed_ms = elapsed_ms(start), "ok"),
            Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "failed"),
        }
        result
    }
    .instrument(span)
    .await
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
