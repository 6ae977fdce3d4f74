//! Roster file parsing
//!
//! The roster is a line-oriented text file. Each non-empty line that does not
//! start with `#` has exactly three whitespace-separated fields:
//!
//! ```text
//! # address      port   role
//! 10.0.1.1       9000   master
//! 10.0.1.10      9001   slave
//! 10.0.1.11      9001   slave
//! ```
//!
//! `slave` lines form the worker roster, in file order. The `master` line is
//! the coordinator's address, needed only by workers. Lines with the wrong
//! number of fields, an unparseable port or an unknown role are skipped.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Default roster location, relative to the working directory
pub const DEFAULT_ROSTER_PATH: &str = "config.txt";

/// Network address of one worker
///
/// Position in the roster is the worker's identity and decides which row
/// range it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerEntry {
    pub address: String,
    pub port: u16,
}

impl WorkerEntry {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for WorkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Coordinator entry as seen by a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorEntry {
    pub address: String,
    pub port: u16,
}

/// Resolved roster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Workers in file order
    pub workers: Vec<WorkerEntry>,
    /// Last `master` line, if any
    pub coordinator: Option<CoordinatorEntry>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Load a roster file
pub fn load_roster(path: &Path) -> Result<Roster> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file: {}", path.display()))?;

    Ok(parse_roster_str(&contents))
}

/// Parse roster contents
pub fn parse_roster_str(contents: &str) -> Roster {
    let mut roster = Roster::default();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [address, port, role] = fields.as_slice() else {
            tracing::debug!(line = line_no + 1, "skipping roster line with {} fields", fields.len());
            continue;
        };

        let Ok(port) = port.parse::<u16>() else {
            tracing::debug!(line = line_no + 1, port = %port, "skipping roster line with invalid port");
            continue;
        };

        match *role {
            "master" => {
                roster.coordinator = Some(CoordinatorEntry {
                    address: address.to_string(),
                    port,
                });
            }
            "slave" => roster.workers.push(WorkerEntry::new(*address, port)),
            other => {
                tracing::debug!(line = line_no + 1, role = %other, "skipping roster line with unknown role");
            }
        }
    }

    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
# cluster layout
10.0.1.1 9000 master

10.0.1.10 9001 slave
10.0.1.11 9002 slave
";

    #[test]
    fn test_parse_sample() {
        let roster = parse_roster_str(SAMPLE);
        assert_eq!(
            roster.workers,
            vec![
                WorkerEntry::new("10.0.1.10", 9001),
                WorkerEntry::new("10.0.1.11", 9002),
            ]
        );
        assert_eq!(
            roster.coordinator,
            Some(CoordinatorEntry {
                address: "10.0.1.1".to_string(),
                port: 9000,
            })
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let roster = parse_roster_str("c 3 slave\na 1 slave\nb 2 slave\n");
        let names: Vec<&str> = roster.workers.iter().map(|w| w.address.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let roster = parse_roster_str(
            "10.0.0.1 9001\n\
             10.0.0.2 9002 slave extra\n\
             10.0.0.3 notaport slave\n\
             10.0.0.4 9004 observer\n\
             10.0.0.5 9005 slave\n",
        );
        assert_eq!(roster.workers, vec![WorkerEntry::new("10.0.0.5", 9005)]);
        assert!(roster.coordinator.is_none());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let roster = parse_roster_str("   \n# 10.0.0.1 9001 slave\n  # indented comment\n");
        assert!(roster.is_empty());
    }

    #[test]
    fn test_load_roster_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let roster = load_roster(file.path()).unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_load_missing_roster() {
        let result = load_roster(Path::new("/nonexistent/roster.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_entry_display() {
        assert_eq!(WorkerEntry::new("host", 80).to_string(), "host:80");
    }
}
