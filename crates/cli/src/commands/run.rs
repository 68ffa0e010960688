// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `redislot run -- <cmd> [args]` - Run a command on a leased database
//!
//! The child sees `REDISADDR`, `REDISDB` and `REDIS_URL`. The database is
//! flushed and released after the child exits, whatever its status.

use anyhow::{Context, Result};
use clap::Args;
use redislot_core::{PoolConfig, ReadinessWaiter, SlotAllocator};
use std::process::ExitCode;
use std::time::Duration;
use tokio::process::Command;

#[derive(Args)]
pub struct RunArgs {
    /// How long to wait for a free database; defaults to the configured wait timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Skip waiting for the server to become ready first
    #[arg(long)]
    pub no_wait: bool,

    /// Command and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub async fn handle(args: RunArgs, config: &PoolConfig) -> Result<ExitCode> {
    let (program, program_args) = args
        .command
        .split_first()
        .context("no command given")?;
    let store = super::store(config);

    if !args.no_wait {
        ReadinessWaiter::new(store.clone(), config).wait().await?;
    }

    let allocator = SlotAllocator::new(store, config.clone());
    let session = allocator
        .acquire_within(args.timeout.unwrap_or(config.wait_timeout))
        .await?;
    let slot = session.slot();
    tracing::info!(%slot, %program, "running command");

    let status = Command::new(program)
        .args(program_args)
        .env("REDISADDR", &config.addr)
        .env("REDISDB", slot.to_string())
        .env("REDIS_URL", session.url())
        .status()
        .await;

    // Released before the spawn error is reported
    let released = session.release().await;
    let status = status.with_context(|| format!("can't run {}", program))?;
    released?;

    Ok(ExitCode::from(child_exit_code(status.code())))
}

/// Exit code to pass through; a child killed by a signal counts as 1
fn child_exit_code(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
