// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed store

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{ErrorKind, RedisError, Value};
use redislot_core::config::slot_url;
use redislot_core::{ClientIntrospection, PoolConfig, SlotId, Store, StoreConnection};
use redislot_core::{StoreError, Subscription};
use std::time::Duration;

/// Store talking to one Redis server
#[derive(Clone, Debug)]
pub struct RedisStore {
    addr: String,
}

impl RedisStore {
    /// `addr` is `host:port` or a `redis://` URL without a database path
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.addr.clone())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn client(&self, slot: SlotId) -> Result<redis::Client, StoreError> {
        redis::Client::open(slot_url(&self.addr, slot)).map_err(to_store_error("OPEN"))
    }
}

#[async_trait]
impl Store for RedisStore {
    type Connection = RedisConnection;
    type Subscription = RedisSubscription;

    async fn connect(&self, slot: SlotId) -> Result<RedisConnection, StoreError> {
        let conn = self
            .client(slot)?
            .get_multiplexed_async_connection()
            .await
            .map_err(to_store_error("CONNECT"))?;
        Ok(RedisConnection { conn, slot })
    }

    async fn subscribe(&self, channel: &str) -> Result<RedisSubscription, StoreError> {
        let mut pubsub = self
            .client(SlotId::CONTROL)?
            .get_async_pubsub()
            .await
            .map_err(to_store_error("CONNECT"))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(to_store_error("SUBSCRIBE"))?;
        Ok(RedisSubscription {
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

/// Dedicated connection; `SELECT` on it affects nobody else
pub struct RedisConnection {
    conn: MultiplexedConnection,
    slot: SlotId,
}

impl RedisConnection {
    /// Database selected through this handle
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Underlying connection, for commands outside the store traits
    pub fn raw(&mut self) -> &mut MultiplexedConnection {
        &mut self.conn
    }
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn select(&mut self, slot: SlotId) -> Result<(), StoreError> {
        let (): () = redis::cmd("SELECT")
            .arg(slot.index())
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("SELECT"))?;
        self.slot = slot;
        Ok(())
    }

    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let reply: Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("SET"))?;
        set_nx_outcome(reply)
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("GET"))
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let _removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("DEL"))?;
        Ok(())
    }

    async fn is_empty(&mut self) -> Result<bool, StoreError> {
        let key: Option<String> = redis::cmd("RANDOMKEY")
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("RANDOMKEY"))?;
        Ok(key.is_none())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        let (): () = redis::cmd("FLUSHDB")
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("FLUSHDB"))?;
        Ok(())
    }

    async fn publish(&mut self, channel: &str, message: &str) -> Result<(), StoreError> {
        let _receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("PUBLISH"))?;
        Ok(())
    }

    async fn config_get(&mut self, parameter: &str) -> Result<Vec<String>, StoreError> {
        redis::cmd("CONFIG")
            .arg("GET")
            .arg(parameter)
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("CONFIG GET"))
    }

    async fn info(&mut self, section: &str) -> Result<String, StoreError> {
        redis::cmd("INFO")
            .arg(section)
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("INFO"))
    }

    async fn introspect(&mut self) -> Result<ClientIntrospection, StoreError> {
        let (client_id, client_list): (i64, String) = redis::pipe()
            .cmd("CLIENT")
            .arg("ID")
            .cmd("CLIENT")
            .arg("LIST")
            .query_async(&mut self.conn)
            .await
            .map_err(to_store_error("CLIENT"))?;
        Ok(ClientIntrospection {
            client_id,
            client_list,
        })
    }
}

/// Messages of one channel subscription
pub struct RedisSubscription {
    messages: BoxStream<'static, redis::Msg>,
}

#[async_trait]
impl Subscription for RedisSubscription {
    async fn next_message(&mut self) -> Option<String> {
        loop {
            let msg = self.messages.next().await?;
            match msg.get_payload::<String>() {
                Ok(payload) => return Some(payload),
                Err(e) => {
                    tracing::warn!(channel = msg.get_channel_name(), error = %e, "skipping non-text message")
                }
            }
        }
    }
}

/// Milliseconds for `PX`, at least 1 since the server rejects 0
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn set_nx_outcome(reply: Value) -> Result<bool, StoreError> {
    match reply {
        Value::Okay => Ok(true),
        Value::Nil => Ok(false),
        other => Err(StoreError::unexpected("SET", format!("{:?}", other))),
    }
}

fn to_store_error(op: &'static str) -> impl Fn(RedisError) -> StoreError {
    move |e| {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            StoreError::Connection(format!("{}: {}", op, e))
        } else if e.kind() == ErrorKind::TypeError {
            StoreError::unexpected(op, e.to_string())
        } else {
            StoreError::command(op, e)
        }
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
