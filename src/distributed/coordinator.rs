//! Coordinator
//!
//! The coordinator:
//! - Partitions the matrix rows across the roster
//! - Opens one session per worker and sends its row range
//! - Waits for each worker's acknowledgment
//! - Reports per-worker success or failure and the end-to-end elapsed time
//!
//! A failed session never aborts the batch. In sequential mode the next
//! worker is attempted; in concurrent mode sibling threads are unaffected.

use crate::config::{DispatchConfig, DispatchStrategy, WorkerEntry};
use crate::distributed::protocol::{receive_ack, send_partition, Header, HEADER_LEN, INT_WIDTH};
use crate::error::{SessionError, Stage};
use crate::matrix::Matrix;
use crate::partition::{partition_rows, RowRange};
use crate::util::affinity::{available_cpus, dispatch_core, pin_current_thread};
use crate::util::time::Timestamp;
use anyhow::{Context, Result};
use std::io;
use std::thread;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::runtime::{Builder, Runtime};

/// Result of one worker's session
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Position in the roster
    pub index: usize,
    pub worker: WorkerEntry,
    pub range: RowRange,
    /// Time from connect to acknowledgment (or failure)
    pub elapsed: Duration,
    pub result: Result<(), SessionError>,
}

impl WorkerOutcome {
    fn failed(index: usize, worker: &WorkerEntry, range: RowRange, error: SessionError) -> Self {
        Self {
            index,
            worker: worker.clone(),
            range,
            elapsed: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Bytes written by a successful session (header and rows)
    pub fn bytes_sent(&self, matrix_size: usize) -> u64 {
        if !self.is_success() {
            return 0;
        }
        (HEADER_LEN + self.range.count * matrix_size * INT_WIDTH) as u64
    }
}

/// Aggregate result of one dispatch
#[derive(Debug)]
pub struct DispatchReport {
    pub strategy: DispatchStrategy,
    pub matrix_size: usize,
    /// One outcome per roster entry, in roster order
    pub outcomes: Vec<WorkerOutcome>,
    /// From just before the first session to just after the last one finished
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| o.bytes_sent(self.matrix_size))
            .sum()
    }
}

/// Dispatches row ranges of a matrix to a roster of workers
pub struct Coordinator {
    config: DispatchConfig,
}

impl Coordinator {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Send every worker its row range and collect acknowledgments
    ///
    /// Returns an error only when nothing can be attempted (empty roster or
    /// no async runtime). Per-worker failures are recorded in the report.
    pub fn dispatch(&self, matrix: &Matrix, roster: &[WorkerEntry]) -> Result<DispatchReport> {
        let ranges = partition_rows(matrix.size(), roster.len())
            .context("Failed to partition matrix rows")?;

        for (index, (worker, range)) in roster.iter().zip(&ranges).enumerate() {
            tracing::debug!(index, %worker, start = range.start, count = range.count, "assigned rows");
        }

        let (outcomes, elapsed) = match self.config.strategy {
            DispatchStrategy::Sequential => self.dispatch_sequential(matrix, roster, &ranges)?,
            DispatchStrategy::Concurrent => self.dispatch_concurrent(matrix, roster, &ranges),
        };

        Ok(DispatchReport {
            strategy: self.config.strategy,
            matrix_size: matrix.size(),
            outcomes,
            elapsed,
        })
    }

    /// One session at a time on a single thread, in roster order
    fn dispatch_sequential(
        &self,
        matrix: &Matrix,
        roster: &[WorkerEntry],
        ranges: &[RowRange],
    ) -> Result<(Vec<WorkerOutcome>, Duration)> {
        let runtime = session_runtime().context("Failed to create tokio runtime")?;

        let start = Timestamp::now();
        let outcomes = runtime.block_on(async {
            let mut outcomes = Vec::with_capacity(roster.len());
            for (index, (worker, &range)) in roster.iter().zip(ranges).enumerate() {
                outcomes.push(self.session(index, worker, matrix, range).await);
            }
            outcomes
        });

        Ok((outcomes, start.elapsed()))
    }

    /// One thread per worker, all spawned before any is joined
    fn dispatch_concurrent(
        &self,
        matrix: &Matrix,
        roster: &[WorkerEntry],
        ranges: &[RowRange],
    ) -> (Vec<WorkerOutcome>, Duration) {
        let cpus = available_cpus();
        let pin = self.config.pin_threads;

        let start = Timestamp::now();
        let outcomes: Vec<WorkerOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = roster
                .iter()
                .zip(ranges)
                .enumerate()
                .map(|(index, (worker, &range))| {
                    let spawned = thread::Builder::new()
                        .name(format!("dispatch-{}", index))
                        .spawn_scoped(scope, move || {
                            if pin {
                                pin_current_thread(dispatch_core(index, cpus));
                            }
                            match session_runtime() {
                                Ok(runtime) => runtime.block_on(self.session(index, worker, matrix, range)),
                                Err(source) => WorkerOutcome::failed(index, worker, range, SessionError::Spawn { source }),
                            }
                        });
                    (index, worker, range, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(index, worker, range, spawned)| match spawned {
                    Ok(handle) => handle.join().unwrap_or_else(|_| {
                        tracing::warn!(index, %worker, "session thread panicked");
                        WorkerOutcome::failed(index, worker, range, SessionError::Panicked)
                    }),
                    Err(source) => {
                        tracing::warn!(index, %worker, "failed to spawn session thread: {}", source);
                        WorkerOutcome::failed(index, worker, range, SessionError::Spawn { source })
                    }
                })
                .collect()
        });

        (outcomes, start.elapsed())
    }

    /// Run one session and record its outcome
    async fn session(&self, index: usize, worker: &WorkerEntry, matrix: &Matrix, range: RowRange) -> WorkerOutcome {
        let start = Timestamp::now();
        let result = self.run_session(worker, matrix, range).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(index, %worker, rows = range.count, "worker acknowledged"),
            Err(e) => tracing::warn!(index, %worker, "session failed: {}", e),
        }

        WorkerOutcome {
            index,
            worker: worker.clone(),
            range,
            elapsed,
            result,
        }
    }

    async fn run_session(&self, worker: &WorkerEntry, matrix: &Matrix, range: RowRange) -> Result<(), SessionError> {
        let header = Header::for_range(matrix.size(), range)?;
        let mut stream = connect(worker, self.config.connect_timeout()).await?;
        tracing::debug!(%worker, "connected");

        let io_timeout = self.config.io_timeout();
        send_partition(&mut stream, header, matrix.rows(range), io_timeout).await?;
        receive_ack(&mut stream, io_timeout).await?;

        Ok(())
    }
}

fn session_runtime() -> io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}

/// Resolve and connect to a worker, trying each resolved address in turn
async fn connect(worker: &WorkerEntry, limit: Option<Duration>) -> Result<TcpStream, SessionError> {
    let addr = worker.to_string();

    let attempt = async {
        let resolved = lookup_host((worker.address.as_str(), worker.port))
            .await
            .map_err(|source| SessionError::Resolve {
                addr: addr.clone(),
                source,
            })?;

        let mut last_error = None;
        for socket_addr in resolved {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(SessionError::Connect {
            addr: addr.clone(),
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses resolved")),
        })
    };

    match limit {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| SessionError::Timeout { stage: Stage::Connect })?,
        None => attempt.await,
    }
}
