//! Coordinator and worker roles
//!
//! # Architecture
//!
//! - **Coordinator**: owns the matrix, partitions its rows, opens one session
//!   per worker (sequentially or one thread per worker) and collects acks
//! - **Worker service**: accepts one connection, receives its row range,
//!   acknowledges it
//!
//! # Modules
//!
//! - `protocol`: Wire format and per-step send/receive
//! - `coordinator`: Dispatch strategies and per-worker outcomes
//! - `worker_service`: Single-shot worker

pub mod coordinator;
pub mod protocol;
pub mod worker_service;

// Re-export key types
pub use coordinator::{Coordinator, DispatchReport, WorkerOutcome};
pub use protocol::{Header, Partition, ACK, HEADER_LEN};
pub use worker_service::{BoundWorker, WorkerReport, WorkerService};
