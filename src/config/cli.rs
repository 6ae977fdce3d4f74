//! CLI argument parsing using clap

use super::DispatchStrategy;
use clap::Parser;
use std::path::PathBuf;

/// Process role selected by the third positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Generates the matrix and dispatches row ranges
    Coordinator,
    /// Receives one row range and acknowledges it
    Worker,
}

/// Rowcast - distribute matrix row ranges to TCP workers
#[derive(Parser, Debug)]
#[command(name = "rowcast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Size of the square matrix (coordinator only, ignored for workers)
    #[arg(value_name = "N")]
    pub matrix_size: u64,

    /// Port number to listen on (worker role)
    #[arg(value_name = "PORT")]
    pub port: u16,

    /// Role: 0 for coordinator, 1 for worker
    #[arg(value_name = "ROLE", value_parser = clap::value_parser!(u8).range(0..=1))]
    pub role: u8,

    /// Roster file listing coordinator and worker addresses
    #[arg(long, env = "ROWCAST_ROSTER")]
    pub roster: Option<PathBuf>,

    /// TOML settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Dispatch strategy (coordinator only)
    #[arg(long, value_enum)]
    pub strategy: Option<DispatchStrategy>,

    /// Seed for matrix generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Connect timeout in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Read/write timeout per protocol stage in milliseconds
    #[arg(long)]
    pub io_timeout_ms: Option<u64>,

    /// Do not pin threads to CPU cores
    #[arg(long)]
    pub no_affinity: bool,

    /// Print the generated matrix before dispatch
    #[arg(long)]
    pub print_matrix: bool,

    /// Write a JSON report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Log level for diagnostics (RUST_LOG overrides)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn role(&self) -> Role {
        match self.role {
            0 => Role::Coordinator,
            _ => Role::Worker,
        }
    }
}
