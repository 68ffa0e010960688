// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! redislot-core: exclusive test database slots on a shared Redis server
//!
//! This crate provides:
//! - The slot allocator and the session handle it returns
//! - The lease adapter over the store's atomic set-if-absent
//! - Store traits, plus an in-memory `FakeStore` for tests
//! - The readiness waiter and status-report parsing
//! - Pool configuration and the shared retry policy

pub mod allocator;
pub mod backoff;
pub mod config;
pub mod error;
pub mod info;
pub mod lease;
pub mod ready;
pub mod session;
pub mod slot;
pub mod store;

pub use allocator::SlotAllocator;
pub use backoff::{Backoff, RetryPolicy};
pub use config::{ConfigError, PoolConfig, ADDR_ENV, DEFAULT_ADDR};
pub use error::{CleanupFailure, CleanupStep, PoolError, ReleaseError};
pub use info::{client_db, parse_info};
pub use lease::{LeaseAdapter, LockAttempt};
pub use ready::{ReadinessWaiter, ReadyError, ReadyPhase};
pub use session::Session;
pub use slot::{lease_stamp, SlotId};
pub use store::{ClientIntrospection, Store, StoreConnection, StoreError, Subscription};

#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeConnection, FakeStore, FakeSubscription, StoreCall, StoreOp};
