//! Human-readable text output

use crate::config::DispatchStrategy;
use crate::distributed::{DispatchReport, Partition, WorkerReport};
use crate::matrix::Matrix;
use crate::util::time::{calculate_throughput, format_duration, format_seconds, format_throughput};

/// Print the coordinator startup line
pub fn print_coordinator_start(matrix_size: usize, port: u16, workers: usize, strategy: DispatchStrategy) {
    println!(
        "Coordinator: n={}, port={}, workers={}, strategy={}",
        matrix_size, port, workers, strategy
    );
    println!();
}

/// Print the full matrix, one row per line
pub fn print_matrix(matrix: &Matrix) {
    println!("Matrix contents:");
    for row in matrix.iter_rows() {
        println!("{}", format_row(row));
    }
    println!();
}

fn format_row(row: &[i32]) -> String {
    row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

/// Preview lines for the top-left `limit × limit` corner of a partition
///
/// Each line ends with `...` to mark it as truncated.
pub fn format_preview(partition: &Partition, limit: usize) -> Vec<String> {
    partition
        .iter_rows()
        .take(limit)
        .map(|row| format!("{} ...", format_row(&row[..row.len().min(limit)])))
        .collect()
}

/// Print what a worker received and its execution time
pub fn print_worker_report(report: &WorkerReport, preview_rows: usize) {
    let partition = &report.partition;

    println!("Connection accepted from {}", report.peer);
    println!(
        "Received submatrix: n={}, start_row={}, num_rows={}",
        partition.matrix_size, partition.range.start, partition.range.count
    );

    if preview_rows > 0 && !partition.data.is_empty() {
        println!("Received submatrix (showing up to {0}x{0}):", preview_rows);
        for line in format_preview(partition, preview_rows) {
            println!("{}", line);
        }
    }

    println!();
    println!("Worker execution time: {} seconds", format_seconds(report.elapsed));
}

/// Print per-worker results and the dispatch summary
pub fn print_dispatch_report(report: &DispatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!(
                "Worker {} ({}): ack, rows {}..{} in {}",
                outcome.index,
                outcome.worker,
                outcome.range.start,
                outcome.range.end(),
                format_duration(outcome.elapsed)
            ),
            Err(e) => println!("Worker {} ({}): FAILED - {}", outcome.index, outcome.worker, e),
        }
    }

    let throughput = calculate_throughput(report.bytes_sent(), report.elapsed);

    println!();
    println!("Strategy: {}", report.strategy);
    println!(
        "Workers: {} succeeded, {} failed ({} total)",
        report.succeeded(),
        report.failed(),
        report.outcomes.len()
    );
    println!("Transferred: {} bytes ({})", report.bytes_sent(), format_throughput(throughput));
    println!();
    println!("Coordinator execution time: {} seconds", format_seconds(report.elapsed));
}
