// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    println!("{}", render(value, format));
}

fn render<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => value.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            tracing::error!(error = %e, "can't serialize output");
            String::new()
        }),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
