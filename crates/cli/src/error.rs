// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! Each failure is shown as:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)

use redislot_core::{ConfigError, PoolError, ReadyError, ReleaseError, StoreError};
use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Describe an error chain, adding hints for the failures we recognise
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let mut out = Self::new(err.to_string());
        for cause in err.chain().skip(1) {
            out = out.with_context(cause.to_string());
        }

        if let Some(e) = err.downcast_ref::<PoolError>() {
            out.suggest_for_pool(e)
        } else if let Some(e) = err.downcast_ref::<ReadyError>() {
            out.suggest_for_ready(e)
        } else if let Some(e) = err.downcast_ref::<ReleaseError>() {
            out.suggest_for_release(e)
        } else if err.chain().any(|c| c.is::<ConfigError>()) {
            out.with_suggestion("Check the file against the documented keys and durations like \"5s\"")
        } else if let Some(e) = err.downcast_ref::<StoreError>() {
            out.suggest_for_store(e)
        } else {
            out
        }
    }

    fn suggest_for_pool(self, err: &PoolError) -> Self {
        match err {
            PoolError::PoolSizeUnreadable(_) => self
                .with_context("CONFIG GET databases did not return a number")
                .with_suggestion("Check that the server is Redis and allows CONFIG GET"),
            PoolError::PoolTooSmall { .. } => self
                .with_context("database 0 is reserved for leases, so at least 2 are needed")
                .with_suggestion("Raise `databases` in redis.conf"),
            PoolError::Exhausted { .. } => self
                .with_context("no database is leased and every one still holds keys")
                .with_suggestion("Flush leftover data: redis-cli -n <db> FLUSHDB")
                .with_suggestion("Raise `databases` in redis.conf"),
            PoolError::Timeout { .. } => self
                .with_context("every database stayed leased by other runs")
                .with_suggestion("Check who holds leases: redislot status")
                .with_suggestion("Wait longer: redislot run --timeout 5m -- <cmd>"),
            PoolError::ProtocolViolation { .. } => self
                .with_context("another client released a database without flushing it")
                .with_suggestion("Make sure every client releases through redislot"),
            PoolError::InvalidBroadcast { .. } => self
                .with_context("something else publishes on the release channel")
                .with_suggestion("Use a different `channel` in the config file"),
            PoolError::Store { source, .. } => self.suggest_for_store(source),
            PoolError::Release(e) => self.suggest_for_release(e),
        }
    }

    fn suggest_for_ready(self, err: &ReadyError) -> Self {
        match err {
            ReadyError::Timeout { .. } => self
                .with_suggestion("Check the address with --addr or REDISADDR")
                .with_suggestion("Wait longer: redislot wait --timeout 30s"),
            ReadyError::Store(e) => self.suggest_for_store(e),
        }
    }

    fn suggest_for_release(self, err: &ReleaseError) -> Self {
        self.with_context(format!(
            "lease on db {} expires on its own after its TTL",
            err.slot()
        ))
    }

    fn suggest_for_store(self, err: &StoreError) -> Self {
        match err {
            StoreError::Connection(_) => self
                .with_suggestion("Check the address with --addr or REDISADDR")
                .with_suggestion("Wait for the server: redislot wait"),
            _ => self,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
