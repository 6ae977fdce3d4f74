//! rowcast - distribute the rows of a square integer matrix across workers
//!
//! A coordinator generates an `N × N` matrix, splits its rows into one
//! contiguous range per worker listed in the roster file, and streams each
//! range over TCP. Every worker accepts a single connection, receives its
//! rows and answers with a three-byte acknowledgment.
//!
//! # Architecture
//!
//! - **Partitioning**: deterministic row ranges, last worker takes the remainder
//! - **Dispatch**: sequential on one thread, or one pinned thread per worker
//! - **Wire format**: native-endian `i32` header and rows, then `ack`
//! - **Reports**: console text plus optional JSON

pub mod config;
pub mod distributed;
pub mod error;
pub mod matrix;
pub mod output;
pub mod partition;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use distributed::{Coordinator, WorkerService};
pub use error::{PartitionError, SessionError, Stage};
pub use matrix::Matrix;
pub use partition::{partition_rows, RowRange};

/// Result type used throughout rowcast
pub type Result<T> = anyhow::Result<T>;
