//! TOML settings file parsing
//!
//! ```toml
//! roster = "cluster.txt"
//!
//! [dispatch]
//! strategy = "concurrent"
//! max_workers = 32
//! pin_threads = true
//! connect_timeout_ms = 2000
//!
//! [worker]
//! pin_core = 0
//! preview_rows = 5
//!
//! [output]
//! json_output = "run.json"
//! pretty_json = true
//! ```

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML settings file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse TOML settings from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML settings")?;

    Ok(config)
}

/// Merge CLI arguments with file settings (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(ref roster) = cli.roster {
        config.roster = roster.clone();
    }
    if let Some(strategy) = cli.strategy {
        config.dispatch.strategy = strategy;
    }
    if let Some(seed) = cli.seed {
        config.dispatch.seed = Some(seed);
    }
    if let Some(ms) = cli.connect_timeout_ms {
        config.dispatch.connect_timeout_ms = Some(ms);
    }
    if let Some(ms) = cli.io_timeout_ms {
        config.dispatch.io_timeout_ms = Some(ms);
        config.worker.io_timeout_ms = Some(ms);
    }
    if cli.no_affinity {
        config.dispatch.pin_threads = false;
        config.worker.pin_core = None;
    }
    if cli.print_matrix {
        config.output.print_matrix = true;
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }

    config
}

/// Build the run configuration from the settings file (if any) and CLI flags
pub fn build_config(cli: &Cli) -> Result<Config> {
    let base = match cli.settings {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    Ok(merge_cli_with_config(cli, base))
}
