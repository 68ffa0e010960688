// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traits for the backing key-value server
//!
//! The allocator only needs a handful of primitives: atomic set-if-absent
//! with expiry, delete, per-connection database selection, an emptiness
//! check, flush, pub/sub, and a few introspection commands.

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeConnection, FakeStore, FakeSubscription, StoreCall, StoreOp};

use crate::info::client_db;
use crate::slot::SlotId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors talking to the store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{op} failed: {message}")]
    Command { op: &'static str, message: String },
    #[error("unexpected reply to {op}: {detail}")]
    UnexpectedReply { op: &'static str, detail: String },
    #[error("broadcast subscription closed")]
    SubscriptionClosed,
}

impl StoreError {
    pub fn command(op: &'static str, message: impl ToString) -> Self {
        Self::Command {
            op,
            message: message.to_string(),
        }
    }

    pub fn unexpected(op: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            op,
            detail: detail.into(),
        }
    }
}

/// Replies of the CLIENT ID / CLIENT LIST batch, read by name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIntrospection {
    pub client_id: i64,
    pub client_list: String,
}

impl ClientIntrospection {
    /// Database this client currently has selected
    pub fn selected_slot(&self) -> Result<SlotId, StoreError> {
        client_db(&self.client_list, self.client_id)
            .map(SlotId)
            .ok_or_else(|| {
                StoreError::unexpected(
                    "CLIENT LIST",
                    format!("no line for own client id {}", self.client_id),
                )
            })
    }
}

/// A single connection with its own selected database
#[async_trait]
pub trait StoreConnection: Send + 'static {
    /// Switch this connection to another database
    async fn select(&mut self, slot: SlotId) -> Result<(), StoreError>;

    /// Create `key` with an expiry unless it already exists; `true` if created
    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    /// Whether the selected database holds no keys
    async fn is_empty(&mut self) -> Result<bool, StoreError>;

    /// Remove every key in the selected database
    async fn flush(&mut self) -> Result<(), StoreError>;

    async fn publish(&mut self, channel: &str, message: &str) -> Result<(), StoreError>;

    /// Raw CONFIG GET reply: alternating parameter names and values
    async fn config_get(&mut self, parameter: &str) -> Result<Vec<String>, StoreError>;

    /// Free-text INFO report for one section
    async fn info(&mut self, section: &str) -> Result<String, StoreError>;

    /// CLIENT ID and CLIENT LIST, executed together before either is read
    async fn introspect(&mut self) -> Result<ClientIntrospection, StoreError>;

    /// Database the server believes this connection has selected
    async fn current_slot(&mut self) -> Result<SlotId, StoreError> {
        self.introspect().await?.selected_slot()
    }
}

/// Stream of broadcast payloads
#[async_trait]
pub trait Subscription: Send + 'static {
    /// Next payload, or `None` once the subscription is gone
    async fn next_message(&mut self) -> Option<String>;
}

/// Factory for connections and subscriptions on one server
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Connection: StoreConnection;
    type Subscription: Subscription;

    /// Open a dedicated connection with `slot` selected
    async fn connect(&self, slot: SlotId) -> Result<Self::Connection, StoreError>;

    /// Subscribe to `channel`; messages published after this returns are delivered
    async fn subscribe(&self, channel: &str) -> Result<Self::Subscription, StoreError>;
}
