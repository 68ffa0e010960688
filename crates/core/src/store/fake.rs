// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for testing
//!
//! Simulates the server semantics the allocator relies on: numbered
//! keyspaces, atomic set-if-absent with expiry on the tokio clock, and
//! fire-and-forget pub/sub. Calls are recorded and any operation can be
//! made to fail.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClientIntrospection, Store, StoreConnection, StoreError, Subscription};
use crate::slot::SlotId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Operation kinds, used to inject failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Connect,
    Select,
    SetIfAbsent,
    Get,
    Delete,
    IsEmpty,
    Flush,
    Publish,
    Subscribe,
    ConfigGet,
    Info,
    Introspect,
}

/// Recorded store call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    Connect { slot: SlotId },
    Select { from: SlotId, to: SlotId },
    SetIfAbsent { slot: SlotId, key: String },
    Get { slot: SlotId, key: String },
    Delete { slot: SlotId, key: String },
    IsEmpty { slot: SlotId },
    Flush { slot: SlotId },
    Publish { channel: String, message: String },
    Subscribe { channel: String },
    ConfigGet { parameter: String },
    Info { section: String },
    Introspect { slot: SlotId },
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

struct FakeState {
    databases: u32,
    keyspaces: HashMap<SlotId, HashMap<String, Entry>>,
    channels: HashMap<String, broadcast::Sender<String>>,
    calls: Vec<StoreCall>,
    /// Injected failures; `None` slot matches every slot
    failures: Vec<(StoreOp, Option<SlotId>)>,
    /// Operations that never reply
    stalled: Vec<StoreOp>,
    config_reply: Option<Vec<String>>,
    loading_reports: u32,
    next_client_id: i64,
}

impl FakeState {
    fn live_keys(&mut self, slot: SlotId) -> Vec<String> {
        let now = Instant::now();
        let keyspace = self.keyspaces.entry(slot).or_default();
        keyspace.retain(|_, entry| entry.is_live(now));
        keyspace.keys().cloned().collect()
    }

    fn live_value(&mut self, slot: SlotId, key: &str) -> Option<String> {
        let now = Instant::now();
        let keyspace = self.keyspaces.entry(slot).or_default();
        match keyspace.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                keyspace.remove(key);
                None
            }
            None => None,
        }
    }

    fn check(&self, op: StoreOp, slot: SlotId) -> Result<(), StoreError> {
        let failing = self
            .failures
            .iter()
            .any(|(o, s)| *o == op && s.map_or(true, |s| s == slot));
        if failing {
            return Err(StoreError::command(
                op_name(op),
                format!("injected failure on slot {}", slot),
            ));
        }
        Ok(())
    }
}

fn op_name(op: StoreOp) -> &'static str {
    match op {
        StoreOp::Connect => "CONNECT",
        StoreOp::Select => "SELECT",
        StoreOp::SetIfAbsent => "SET NX",
        StoreOp::Get => "GET",
        StoreOp::Delete => "DEL",
        StoreOp::IsEmpty => "RANDOMKEY",
        StoreOp::Flush => "FLUSHDB",
        StoreOp::Publish => "PUBLISH",
        StoreOp::Subscribe => "SUBSCRIBE",
        StoreOp::ConfigGet => "CONFIG GET",
        StoreOp::Info => "INFO",
        StoreOp::Introspect => "CLIENT",
    }
}

/// Fake store for testing
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    /// A server configured with `databases` numbered keyspaces
    pub fn new(databases: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                databases,
                keyspaces: HashMap::new(),
                channels: HashMap::new(),
                calls: Vec::new(),
                failures: Vec::new(),
                stalled: Vec::new(),
                config_reply: None,
                loading_reports: 0,
                next_client_id: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Messages published so far, as `(channel, message)`
    pub fn published(&self) -> Vec<(String, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Publish { channel, message } => Some((channel.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Write a key directly, bypassing call recording
    pub fn put(&self, slot: SlotId, key: &str, value: &str) {
        self.put_with_ttl(slot, key, value, None);
    }

    pub fn put_with_ttl(&self, slot: SlotId, key: &str, value: &str, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.state().keyspaces.entry(slot).or_default().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    pub fn value(&self, slot: SlotId, key: &str) -> Option<String> {
        self.state().live_value(slot, key)
    }

    /// Remaining time to live of a key, if it has one
    pub fn ttl(&self, slot: SlotId, key: &str) -> Option<Duration> {
        let state = self.state();
        let entry = state.keyspaces.get(&slot)?.get(key)?;
        let at = entry.expires_at?;
        Some(at.saturating_duration_since(Instant::now()))
    }

    /// Live keys in a keyspace, sorted
    pub fn keys(&self, slot: SlotId) -> Vec<String> {
        let mut keys = self.state().live_keys(slot);
        keys.sort();
        keys
    }

    /// Make every future call of `op` fail
    pub fn fail(&self, op: StoreOp) {
        self.state().failures.push((op, None));
    }

    /// Make calls of `op` targeting `slot` fail
    pub fn fail_on_slot(&self, op: StoreOp, slot: SlotId) {
        self.state().failures.push((op, Some(slot)));
    }

    /// Remove all injected failures of `op`
    pub fn heal(&self, op: StoreOp) {
        self.state().failures.retain(|(o, _)| *o != op);
    }

    /// Make every future call of `op` hang without replying
    pub fn stall(&self, op: StoreOp) {
        self.state().stalled.push(op);
    }

    async fn reply_or_stall(&self, op: StoreOp) {
        let stalled = self.state().stalled.contains(&op);
        if stalled {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
    }

    /// Replace the CONFIG GET reply
    pub fn set_config_reply(&self, reply: Vec<String>) {
        self.state().config_reply = Some(reply);
    }

    /// Report `loading:1` for the next `count` INFO calls
    pub fn set_loading_reports(&self, count: u32) {
        self.state().loading_reports = count;
    }

    /// Current number of subscribers on a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state()
            .channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a channel; current subscribers see it close
    pub fn close_channel(&self, channel: &str) {
        self.state().channels.remove(channel);
    }

    fn record(&self, call: StoreCall) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl Store for FakeStore {
    type Connection = FakeConnection;
    type Subscription = FakeSubscription;

    async fn connect(&self, slot: SlotId) -> Result<FakeConnection, StoreError> {
        self.reply_or_stall(StoreOp::Connect).await;
        self.record(StoreCall::Connect { slot });

        let mut state = self.state();
        if state.check(StoreOp::Connect, slot).is_err() {
            return Err(StoreError::Connection(format!(
                "injected failure connecting to slot {}",
                slot
            )));
        }
        if slot.index() >= state.databases {
            return Err(StoreError::command("SELECT", "DB index is out of range"));
        }
        state.next_client_id += 1;
        Ok(FakeConnection {
            store: self.clone(),
            slot,
            client_id: state.next_client_id,
        })
    }

    async fn subscribe(&self, channel: &str) -> Result<FakeSubscription, StoreError> {
        self.reply_or_stall(StoreOp::Subscribe).await;
        self.record(StoreCall::Subscribe {
            channel: channel.to_string(),
        });

        let mut state = self.state();
        state.check(StoreOp::Subscribe, SlotId::CONTROL)?;
        let rx = state
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe();
        Ok(FakeSubscription { rx })
    }
}

/// Connection to a [`FakeStore`]
pub struct FakeConnection {
    store: FakeStore,
    slot: SlotId,
    client_id: i64,
}

impl FakeConnection {
    /// Database selected on this connection
    pub fn selected(&self) -> SlotId {
        self.slot
    }
}

#[async_trait]
impl StoreConnection for FakeConnection {
    async fn select(&mut self, slot: SlotId) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.store.record(StoreCall::Select {
            from: self.slot,
            to: slot,
        });

        let state = self.store.state();
        state.check(StoreOp::Select, slot)?;
        if slot.index() >= state.databases {
            return Err(StoreError::command("SELECT", "DB index is out of range"));
        }
        self.slot = slot;
        Ok(())
    }

    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.store.reply_or_stall(StoreOp::SetIfAbsent).await;
        self.store.record(StoreCall::SetIfAbsent {
            slot: self.slot,
            key: key.to_string(),
        });

        let mut state = self.store.state();
        state.check(StoreOp::SetIfAbsent, self.slot)?;
        if state.live_value(self.slot, key).is_some() {
            return Ok(false);
        }
        state.keyspaces.entry(self.slot).or_default().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        tokio::task::yield_now().await;
        self.store.record(StoreCall::Get {
            slot: self.slot,
            key: key.to_string(),
        });

        let mut state = self.store.state();
        state.check(StoreOp::Get, self.slot)?;
        Ok(state.live_value(self.slot, key))
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.store.record(StoreCall::Delete {
            slot: self.slot,
            key: key.to_string(),
        });

        let mut state = self.store.state();
        state.check(StoreOp::Delete, self.slot)?;
        state.keyspaces.entry(self.slot).or_default().remove(key);
        Ok(())
    }

    async fn is_empty(&mut self) -> Result<bool, StoreError> {
        self.store.reply_or_stall(StoreOp::IsEmpty).await;
        self.store.record(StoreCall::IsEmpty { slot: self.slot });

        let mut state = self.store.state();
        state.check(StoreOp::IsEmpty, self.slot)?;
        Ok(state.live_keys(self.slot).is_empty())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.store.record(StoreCall::Flush { slot: self.slot });

        let mut state = self.store.state();
        state.check(StoreOp::Flush, self.slot)?;
        state.keyspaces.remove(&self.slot);
        Ok(())
    }

    async fn publish(&mut self, channel: &str, message: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.store.record(StoreCall::Publish {
            channel: channel.to_string(),
            message: message.to_string(),
        });

        let state = self.store.state();
        state.check(StoreOp::Publish, self.slot)?;
        if let Some(tx) = state.channels.get(channel) {
            // No receivers means nobody is listening, which pub/sub allows
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn config_get(&mut self, parameter: &str) -> Result<Vec<String>, StoreError> {
        self.store.reply_or_stall(StoreOp::ConfigGet).await;
        self.store.record(StoreCall::ConfigGet {
            parameter: parameter.to_string(),
        });

        let state = self.store.state();
        state.check(StoreOp::ConfigGet, self.slot)?;
        if let Some(reply) = &state.config_reply {
            return Ok(reply.clone());
        }
        match parameter {
            "databases" => Ok(vec![
                "databases".to_string(),
                state.databases.to_string(),
            ]),
            _ => Ok(Vec::new()),
        }
    }

    async fn info(&mut self, section: &str) -> Result<String, StoreError> {
        self.store.reply_or_stall(StoreOp::Info).await;
        self.store.record(StoreCall::Info {
            section: section.to_string(),
        });

        let mut state = self.store.state();
        state.check(StoreOp::Info, self.slot)?;
        let loading = if state.loading_reports > 0 {
            state.loading_reports -= 1;
            1
        } else {
            0
        };
        Ok(format!(
            "# Persistence\r\nloading:{}\r\nrdb_changes_since_last_save:0\r\naof_enabled:0\r\n",
            loading
        ))
    }

    async fn introspect(&mut self) -> Result<ClientIntrospection, StoreError> {
        tokio::task::yield_now().await;
        self.store
            .record(StoreCall::Introspect { slot: self.slot });

        let state = self.store.state();
        state.check(StoreOp::Introspect, self.slot)?;
        let other = self.client_id + 1000;
        Ok(ClientIntrospection {
            client_id: self.client_id,
            client_list: format!(
                "id={other} addr=127.0.0.1:40000 laddr=127.0.0.1:6379 fd=7 name= age=3 idle=3 flags=N db=0 sub=0 psub=0 cmd=get\n\
                 id={id} addr=127.0.0.1:40001 laddr=127.0.0.1:6379 fd=8 name= age=0 idle=0 flags=N db={db} sub=0 psub=0 cmd=client|list\n",
                id = self.client_id,
                db = self.slot,
            ),
        })
    }
}

/// Subscription on a [`FakeStore`] channel
pub struct FakeSubscription {
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for FakeSubscription {
    async fn next_message(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
