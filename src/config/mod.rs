//! Configuration module
//!
//! Handles CLI argument parsing, the roster file, optional TOML settings and
//! validation. The resulting `Config` is built once at startup and passed by
//! reference to the coordinator and worker.

pub mod cli;
pub mod roster;
pub mod toml;
pub mod validator;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use roster::{CoordinatorEntry, Roster, WorkerEntry};

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Roster file path
    #[serde(default = "default_roster_path")]
    pub roster: PathBuf,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roster: default_roster_path(),
            dispatch: DispatchConfig::default(),
            worker: WorkerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_roster_path() -> PathBuf {
    PathBuf::from(roster::DEFAULT_ROSTER_PATH)
}

/// How the coordinator schedules sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// One session at a time, in roster order
    #[default]
    Sequential,
    /// One pinned thread per worker, all started before any is joined
    Concurrent,
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStrategy::Sequential => write!(f, "sequential"),
            DispatchStrategy::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Coordinator dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub strategy: DispatchStrategy,
    /// Upper bound on roster size
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Pin each concurrent session thread to a CPU core
    #[serde(default = "default_true")]
    pub pin_threads: bool,
    /// Connect timeout in milliseconds (blocks indefinitely when unset)
    pub connect_timeout_ms: Option<u64>,
    /// Per-stage read/write timeout in milliseconds (blocks indefinitely when unset)
    pub io_timeout_ms: Option<u64>,
    /// Seed for matrix generation
    pub seed: Option<u64>,
}

impl DispatchConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: DispatchStrategy::default(),
            max_workers: default_max_workers(),
            pin_threads: true,
            connect_timeout_ms: None,
            io_timeout_ms: None,
            seed: None,
        }
    }
}

fn default_max_workers() -> usize {
    32
}

fn default_true() -> bool {
    true
}

/// Worker role settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Core the worker pins itself to (`None` disables pinning)
    #[serde(default = "default_pin_core")]
    pub pin_core: Option<usize>,
    /// Rows and columns shown in the received-submatrix preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Per-stage read/write timeout in milliseconds
    pub io_timeout_ms: Option<u64>,
}

impl WorkerConfig {
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pin_core: default_pin_core(),
            preview_rows: default_preview_rows(),
            io_timeout_ms: None,
        }
    }
}

fn default_pin_core() -> Option<usize> {
    Some(0)
}

fn default_preview_rows() -> usize {
    5
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print the full generated matrix (coordinator)
    #[serde(default)]
    pub print_matrix: bool,
    /// Write a JSON report to this path
    pub json_output: Option<PathBuf>,
    /// Pretty-print the JSON report
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_matrix: false,
            json_output: None,
            pretty_json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.roster, PathBuf::from("config.txt"));
        assert_eq!(config.dispatch.strategy, DispatchStrategy::Sequential);
        assert_eq!(config.dispatch.max_workers, 32);
        assert!(config.dispatch.pin_threads);
        assert!(config.dispatch.connect_timeout().is_none());
        assert_eq!(config.worker.pin_core, Some(0));
        assert_eq!(config.worker.preview_rows, 5);
        assert!(!config.output.print_matrix);
        assert!(config.output.pretty_json);
    }

    #[test]
    fn test_timeouts_convert_to_durations() {
        let dispatch = DispatchConfig {
            connect_timeout_ms: Some(250),
            io_timeout_ms: Some(1500),
            ..Default::default()
        };
        assert_eq!(dispatch.connect_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(dispatch.io_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(DispatchStrategy::Sequential.to_string(), "sequential");
        assert_eq!(DispatchStrategy::Concurrent.to_string(), "concurrent");
    }
}
