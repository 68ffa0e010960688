// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup wait for the store: reachable socket first, then done loading

use crate::backoff::{deadline_after, RetryPolicy};
use crate::config::PoolConfig;
use crate::info::parse_info;
use crate::slot::SlotId;
use crate::store::{Store, StoreConnection, StoreError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Phase the waiter was in when it gave up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyPhase {
    Socket,
    Loading,
}

impl fmt::Display for ReadyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyPhase::Socket => write!(f, "socket"),
            ReadyPhase::Loading => write!(f, "loading"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadyError {
    #[error(
        "store not ready after {timeout:?} in {phase} phase: {}",
        .last_error.as_deref().unwrap_or("no attempt completed")
    )]
    Timeout {
        phase: ReadyPhase,
        timeout: Duration,
        last_error: Option<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Blocks until the store accepts connections and reports `loading:0`
pub struct ReadinessWaiter<S: Store> {
    store: S,
    addr: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl<S: Store> ReadinessWaiter<S> {
    pub fn new(store: S, config: &PoolConfig) -> Self {
        Self {
            store,
            addr: socket_addr(&config.addr).to_string(),
            timeout: config.ready_timeout,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wait up to the configured `ready_timeout`
    pub async fn wait(&self) -> Result<(), ReadyError> {
        self.wait_within(self.timeout).await
    }

    pub async fn wait_within(&self, timeout: Duration) -> Result<(), ReadyError> {
        let deadline = deadline_after(Instant::now(), timeout);
        self.wait_for_socket(deadline, timeout).await?;
        self.wait_until_loaded(deadline, timeout).await
    }

    async fn wait_for_socket(&self, deadline: Instant, timeout: Duration) -> Result<(), ReadyError> {
        let mut backoff = self.policy.start(deadline);
        let mut last_error = None;
        loop {
            match tokio::time::timeout_at(deadline, TcpStream::connect(&self.addr)).await {
                Ok(Ok(_stream)) => {
                    tracing::debug!(addr = %self.addr, "store socket reachable");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tracing::debug!(addr = %self.addr, error = %e, "store socket not reachable yet");
                    last_error = Some(format!("connect {}: {}", self.addr, e));
                }
                Err(_) => {}
            }
            if !backoff.wait().await {
                return Err(ReadyError::Timeout {
                    phase: ReadyPhase::Socket,
                    timeout,
                    last_error,
                });
            }
        }
    }

    async fn wait_until_loaded(
        &self,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<(), ReadyError> {
        let stalled = |last_error: &str| ReadyError::Timeout {
            phase: ReadyPhase::Loading,
            timeout,
            last_error: Some(last_error.to_string()),
        };

        let mut conn = tokio::time::timeout_at(deadline, self.store.connect(SlotId::CONTROL))
            .await
            .map_err(|_| stalled("no reply to connect"))??;
        let mut backoff = self.policy.start(deadline);
        loop {
            if backoff.is_expired(Instant::now()) {
                return Err(stalled("store still loading its dataset"));
            }

            // Query errors are not retried, only the loading flag is
            let report = tokio::time::timeout_at(deadline, conn.info("persistence"))
                .await
                .map_err(|_| stalled("no reply to INFO persistence"))??;
            match parse_info(&report).get("loading").map(String::as_str) {
                Some("0") => {
                    tracing::debug!("store finished loading");
                    return Ok(());
                }
                other => tracing::debug!(loading = ?other, "store still loading"),
            }
            backoff.wait().await;
        }
    }
}

/// `host:port` part of an address that may carry a scheme or db path
fn socket_addr(addr: &str) -> &str {
    let rest = addr.split_once("://").map_or(addr, |(_, rest)| rest);
    let rest = rest.split_once('/').map_or(rest, |(host, _)| host);
    rest.rsplit_once('@').map_or(rest, |(_, host)| host)
}

#[cfg(test)]
#[path = "ready_tests.rs"]
mod tests;
