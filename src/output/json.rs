//! JSON report output
//!
//! Reports carry a generation timestamp and the host name so files from
//! several machines can be told apart.

use crate::config::{DispatchStrategy, WorkerEntry};
use crate::distributed::{DispatchReport, WorkerReport};
use crate::partition::RowRange;
use crate::util::time::format_seconds;
use crate::Result;
use serde::Serialize;
use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Duration with both nanoseconds and `seconds.nanoseconds` text
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuration {
    pub nanos: u64,
    pub seconds: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            nanos: d.as_nanos() as u64,
            seconds: format_seconds(d),
        }
    }
}

/// One worker's line in the coordinator report
#[derive(Debug, Clone, Serialize)]
pub struct JsonWorkerOutcome {
    pub index: usize,
    pub worker: WorkerEntry,
    pub range: RowRange,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub elapsed: JsonDuration,
}

/// Coordinator run report
#[derive(Debug, Clone, Serialize)]
pub struct JsonDispatchReport {
    pub generated_at: String,
    pub host: String,
    pub strategy: DispatchStrategy,
    pub matrix_size: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_sent: u64,
    pub elapsed: JsonDuration,
    pub workers: Vec<JsonWorkerOutcome>,
}

impl From<&DispatchReport> for JsonDispatchReport {
    fn from(report: &DispatchReport) -> Self {
        let workers = report
            .outcomes
            .iter()
            .map(|outcome| JsonWorkerOutcome {
                index: outcome.index,
                worker: outcome.worker.clone(),
                range: outcome.range,
                success: outcome.is_success(),
                error: outcome.result.as_ref().err().map(|e| e.to_string()),
                failed_stage: outcome
                    .result
                    .as_ref()
                    .err()
                    .and_then(|e| e.stage())
                    .map(|stage| stage.to_string()),
                elapsed: JsonDuration::from_duration(outcome.elapsed),
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            host: host_name(),
            strategy: report.strategy,
            matrix_size: report.matrix_size,
            succeeded: report.succeeded(),
            failed: report.failed(),
            bytes_sent: report.bytes_sent(),
            elapsed: JsonDuration::from_duration(report.elapsed),
            workers,
        }
    }
}

/// Worker run report
#[derive(Debug, Clone, Serialize)]
pub struct JsonWorkerReport {
    pub generated_at: String,
    pub host: String,
    pub peer: SocketAddr,
    pub matrix_size: usize,
    pub range: RowRange,
    pub values_received: usize,
    pub elapsed: JsonDuration,
}

impl From<&WorkerReport> for JsonWorkerReport {
    fn from(report: &WorkerReport) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            host: host_name(),
            peer: report.peer,
            matrix_size: report.partition.matrix_size,
            range: report.partition.range,
            values_received: report.partition.data.len(),
            elapsed: JsonDuration::from_duration(report.elapsed),
        }
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Write a JSON report to file
pub fn write_json_output<T: Serialize>(output_path: &Path, report: &T, pretty: bool) -> Result<()> {
    let file = File::create(output_path)?;

    if pretty {
        serde_json::to_writer_pretty(file, report)?;
    } else {
        serde_json::to_writer(file, report)?;
    }

    Ok(())
}
