// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `redislot status` - Show which databases are leased

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use redislot_core::{LeaseAdapter, PoolConfig, SlotId, Store, StoreError};
use serde::Serialize;
use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct PoolStatus {
    pub addr: String,
    pub pool_size: u32,
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Serialize)]
pub struct SlotStatus {
    pub slot: SlotId,
    /// Lease stamp, present while the slot is leased
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leased_since: Option<String>,
}

impl PoolStatus {
    pub fn leased(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.leased_since.is_some())
            .count()
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Redis: {}", self.addr)?;
        writeln!(
            f,
            "Databases: {} ({} leased, db 0 reserved)",
            self.pool_size,
            self.leased()
        )?;
        for slot in &self.slots {
            match &slot.leased_since {
                Some(since) => write!(f, "\n  db {:<3} leased since {}", slot.slot.index(), since)?,
                None => write!(f, "\n  db {:<3} free", slot.slot.index())?,
            }
        }
        Ok(())
    }
}

pub async fn handle(args: StatusArgs, config: &PoolConfig) -> Result<ExitCode> {
    let status = collect(&super::store(config), config).await?;
    output::print(&status, args.format);
    Ok(ExitCode::SUCCESS)
}

/// Read every lease key without touching any of them
pub async fn collect<S: Store>(store: &S, config: &PoolConfig) -> Result<PoolStatus, StoreError> {
    let conn = store.connect(SlotId::CONTROL).await?;
    let mut leases = LeaseAdapter::new(conn, Arc::new(config.clone()));
    let pool_size = leases.pool_size().await?;

    let mut slots = Vec::new();
    for slot in SlotId::allocatable(pool_size) {
        slots.push(SlotStatus {
            slot,
            leased_since: leases.holder(slot).await?,
        });
    }

    Ok(PoolStatus {
        addr: config.addr.clone(),
        pool_size,
        slots,
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
