// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use redislot_core::{FakeStore, PoolConfig, SlotAllocator, StoreOp};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a future with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn connect_runs_in_span() {
    let (logs, result) = with_tracing(|| async {
        TracedStore::new(FakeStore::new(4))
            .connect(SlotId(2))
            .await
            .map(|_| ())
    });

    assert!(result.is_ok());
    assert!(logs.contains("store.connect"), "logs: {}", logs);
    assert!(logs.contains("connected"));
    assert!(logs.contains("elapsed_ms"));
}

#[test]
fn failed_connect_is_logged_as_error() {
    let fake = FakeStore::new(4);
    fake.fail(StoreOp::Connect);

    let (logs, result) = with_tracing(|| async move {
        TracedStore::new(fake).connect(SlotId(1)).await.map(|_| ())
    });

    assert!(matches!(result, Err(StoreError::Connection(_))));
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("connect failed"));
}

#[test]
fn failed_command_names_operation() {
    let fake = FakeStore::new(4);
    let (logs, result) = with_tracing(|| async move {
        let mut conn = TracedStore::new(fake.clone()).connect(SlotId(1)).await?;
        fake.fail(StoreOp::Flush);
        conn.flush().await
    });

    assert!(result.is_err());
    assert!(logs.contains("store.command"));
    assert!(logs.contains("op=\"FLUSHDB\""), "logs: {}", logs);
    assert!(logs.contains("WARN"));
}

#[test]
fn select_tracks_current_slot() {
    let (logs, slot) = with_tracing(|| async {
        let mut conn = TracedStore::new(FakeStore::new(4))
            .connect(SlotId(3))
            .await
            .unwrap();
        conn.select(SlotId::CONTROL).await.unwrap();
        conn.into_inner().selected()
    });

    assert_eq!(slot, SlotId::CONTROL);
    assert!(logs.contains("selected"));
    assert!(logs.contains("from=3"));
    assert!(logs.contains("to=0"));
}

#[test]
fn allocator_over_traced_store_logs_lifecycle() {
    let fake = FakeStore::new(4);
    let (logs, result) = with_tracing(|| async move {
        let alloc = SlotAllocator::new(TracedStore::new(fake), PoolConfig::default().with_debug(true));
        let session = alloc.acquire().await.unwrap();
        let slot = session.slot();
        session.release().await.unwrap();
        slot
    });

    assert_eq!(result, SlotId(1));
    assert!(logs.contains("set if absent"));
    assert!(logs.contains("number of databases: 4, chosen: 1"));
    assert!(logs.contains("flushed"));
    assert!(logs.contains("published"));
}
