// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::allocator::SlotAllocator;
use crate::store::{FakeStore, StoreCall, StoreOp};
use std::time::Duration;

const CHANNEL: &str = "redis-test-broadcast";

async fn session(store: &FakeStore) -> Session<FakeStore> {
    SlotAllocator::new(store.clone(), PoolConfig::default())
        .acquire()
        .await
        .unwrap()
}

async fn write(session: &mut Session<FakeStore>, key: &str) {
    session
        .connection()
        .set_if_absent(key, "v", Duration::from_secs(60))
        .await
        .unwrap();
}

#[tokio::test]
async fn release_flushes_unleases_and_announces() {
    let store = FakeStore::new(4);
    let mut session = session(&store).await;
    write(&mut session, "a").await;
    write(&mut session, "b").await;
    store.clear_calls();

    session.release().await.unwrap();

    assert!(store.keys(SlotId(1)).is_empty());
    assert!(store.keys(SlotId::CONTROL).is_empty());
    assert_eq!(
        store.published(),
        vec![(CHANNEL.to_string(), "1".to_string())]
    );
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::Flush { slot: SlotId(1) },
            StoreCall::Select {
                from: SlotId(1),
                to: SlotId::CONTROL
            },
            StoreCall::Delete {
                slot: SlotId::CONTROL,
                key: "redis-test-1".to_string()
            },
            StoreCall::Publish {
                channel: CHANNEL.to_string(),
                message: "1".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn flush_failure_still_releases_lease() {
    let store = FakeStore::new(4);
    let mut session = session(&store).await;
    write(&mut session, "a").await;
    store.fail(StoreOp::Flush);

    let err = session.release().await.unwrap_err();

    assert_eq!(err.slot(), SlotId(1));
    let steps: Vec<_> = err.failures().iter().map(|f| f.step).collect();
    assert_eq!(steps, vec![CleanupStep::Flush]);
    assert_eq!(store.value(SlotId::CONTROL, "redis-test-1"), None);
    assert_eq!(store.published().len(), 1);
}

#[tokio::test]
async fn control_select_failure_aborts_and_leaves_lease() {
    let store = FakeStore::new(4);
    let session = session(&store).await;
    store.fail_on_slot(StoreOp::Select, SlotId::CONTROL);

    let err = session.release().await.unwrap_err();

    assert!(matches!(err, ReleaseError::Aborted { slot: SlotId(1), .. }));
    assert!(store.value(SlotId::CONTROL, "redis-test-1").is_some());
    assert!(store.published().is_empty());
}

#[tokio::test]
async fn delete_failure_still_announces() {
    let store = FakeStore::new(4);
    let session = session(&store).await;
    store.fail(StoreOp::Delete);

    let err = session.release().await.unwrap_err();

    let steps: Vec<_> = err.failures().iter().map(|f| f.step).collect();
    assert_eq!(steps, vec![CleanupStep::DeleteLease]);
    assert_eq!(store.published().len(), 1);
}

#[tokio::test]
async fn every_failed_step_is_reported() {
    let store = FakeStore::new(4);
    let session = session(&store).await;
    store.fail(StoreOp::Flush);
    store.fail(StoreOp::Delete);
    store.fail(StoreOp::Publish);

    let err = session.release().await.unwrap_err();

    let steps: Vec<_> = err.failures().iter().map(|f| f.step).collect();
    assert_eq!(
        steps,
        vec![
            CleanupStep::Flush,
            CleanupStep::DeleteLease,
            CleanupStep::Publish
        ]
    );
    assert!(err.to_string().contains("slot 1"));
}

#[tokio::test]
async fn dropped_session_is_cleaned_up_in_background() {
    let store = FakeStore::new(4);
    let mut session = session(&store).await;
    write(&mut session, "a").await;

    drop(session);
    for _ in 0..50 {
        if !store.published().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert!(store.keys(SlotId(1)).is_empty());
    assert!(store.keys(SlotId::CONTROL).is_empty());
    assert_eq!(
        store.published(),
        vec![(CHANNEL.to_string(), "1".to_string())]
    );
}

#[tokio::test]
async fn released_slot_is_reusable() {
    let store = FakeStore::new(2);
    let alloc = SlotAllocator::new(store.clone(), PoolConfig::default());

    let mut first = alloc.acquire().await.unwrap();
    write(&mut first, "a").await;
    first.release().await.unwrap();

    let second = alloc.acquire_within(Duration::ZERO).await.unwrap();
    assert_eq!(second.slot(), SlotId(1));
    second.release().await.unwrap();
}

#[test]
fn debug_shows_slot_only() {
    let store = FakeStore::new(4);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let held = rt.block_on(session(&store));
    assert_eq!(format!("{:?}", held), "Session { slot: SlotId(1) }");
    rt.block_on(held.release()).unwrap();
}
