// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for slot allocation and release

use crate::slot::SlotId;
use crate::store::StoreError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from acquiring a slot
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cannot read number of databases: {0}")]
    PoolSizeUnreadable(#[source] StoreError),
    #[error("minimal acceptable number of databases is 2, server has {pool_size}")]
    PoolTooSmall { pool_size: u32 },
    #[error("clean databases not found among {pool_size} databases, flush some of them")]
    Exhausted { pool_size: u32 },
    #[error("no free database within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("expected clean database {slot} after its lease was released, but found keys")]
    ProtocolViolation { slot: SlotId },
    #[error("invalid slot index on broadcast channel: {payload:?}")]
    InvalidBroadcast { payload: String },
    #[error("store error on slot {slot}: {source}")]
    Store {
        slot: SlotId,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Release(#[from] ReleaseError),
}

impl PoolError {
    pub(crate) fn store(slot: SlotId) -> impl FnOnce(StoreError) -> PoolError {
        move |source| PoolError::Store { slot, source }
    }

    /// The server is set up so no amount of waiting can succeed
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PoolError::PoolSizeUnreadable(_)
                | PoolError::PoolTooSmall { .. }
                | PoolError::Exhausted { .. }
        )
    }
}

/// Step of the release sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupStep {
    Flush,
    SelectControl,
    DeleteLease,
    Publish,
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupStep::Flush => "flush",
            CleanupStep::SelectControl => "select control slot",
            CleanupStep::DeleteLease => "delete lease",
            CleanupStep::Publish => "publish release",
        };
        f.write_str(name)
    }
}

/// One failed release step
#[derive(Debug, Clone, Error)]
#[error("{step}: {source}")]
pub struct CleanupFailure {
    pub step: CleanupStep,
    #[source]
    pub source: StoreError,
}

/// Errors from releasing a slot
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Some steps failed; every step was still attempted
    #[error("release of slot {slot} incomplete: {}", summarize(.failures))]
    Incomplete {
        slot: SlotId,
        failures: Vec<CleanupFailure>,
    },
    /// Could not reach the control slot, lease and broadcast were skipped
    #[error("release of slot {slot} aborted, cannot select control slot: {source}")]
    Aborted {
        slot: SlotId,
        #[source]
        source: StoreError,
        earlier: Vec<CleanupFailure>,
    },
}

impl ReleaseError {
    pub fn slot(&self) -> SlotId {
        match self {
            ReleaseError::Incomplete { slot, .. } | ReleaseError::Aborted { slot, .. } => *slot,
        }
    }

    /// Every failed step, in execution order
    pub fn failures(&self) -> Vec<CleanupFailure> {
        match self {
            ReleaseError::Incomplete { failures, .. } => failures.clone(),
            ReleaseError::Aborted {
                source, earlier, ..
            } => {
                let mut all = earlier.clone();
                all.push(CleanupFailure {
                    step: CleanupStep::SelectControl,
                    source: source.clone(),
                });
                all
            }
        }
    }
}

fn summarize(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
