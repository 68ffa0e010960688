// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! redislot - exclusive Redis databases for parallel test runs

mod commands;
mod error;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{run, status, wait};
use redislot_core::PoolConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "redislot",
    version,
    about = "Lease an exclusive, empty Redis database for a test run"
)]
struct Cli {
    /// Redis address (host:port), overriding REDISADDR and the config file
    #[arg(long, global = true)]
    addr: Option<String>,

    /// TOML file with pool settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log slot lifecycle at info level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until the server accepts connections and has loaded its data
    Wait(wait::WaitArgs),
    /// Run a command with a leased database exported in its environment
    Run(run::RunArgs),
    /// Show the pool size and which databases are leased
    Status(status::StatusArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", error::CliError::from_anyhow(&e));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    tracing::debug!(addr = %config.addr, "using redis");

    match cli.command {
        Commands::Wait(args) => wait::handle(args, &config).await,
        Commands::Run(args) => run::handle(args, &config).await,
        Commands::Status(args) => status::handle(args, &config).await,
    }
}

/// Config file (or defaults), then REDISADDR, then command-line flags
fn load_config(cli: &Cli) -> Result<PoolConfig> {
    let config = match &cli.config {
        Some(path) => PoolConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PoolConfig::default(),
    };
    let mut config = config.apply_env();
    if let Some(addr) = &cli.addr {
        config = config.with_addr(addr.clone());
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    Ok(config)
}

fn setup_logging(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if debug { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
