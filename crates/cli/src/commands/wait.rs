// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `redislot wait [--timeout 5s]` - Block until the server is ready

use anyhow::Result;
use clap::Args;
use redislot_core::{PoolConfig, ReadinessWaiter};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args)]
pub struct WaitArgs {
    /// How long to wait (e.g. "5s", "1m"); defaults to the configured ready timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

pub async fn handle(args: WaitArgs, config: &PoolConfig) -> Result<ExitCode> {
    let timeout = args.timeout.unwrap_or(config.ready_timeout);
    ReadinessWaiter::new(super::store(config), config)
        .wait_within(timeout)
        .await?;

    println!("redis at {} is ready", config.addr);
    Ok(ExitCode::SUCCESS)
}
