//! Typed errors for the partition-and-transfer core
//!
//! Configuration and process-level failures use `anyhow` throughout the crate.
//! Failures below the session boundary are typed here so the coordinator can
//! record exactly which worker failed and at which stage, without aborting
//! the rest of the batch.

use std::fmt;
use std::io;
use thiserror::Error;

/// Point in the five-step session sequence where a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Address resolution or TCP connect (coordinator side)
    Connect,
    /// Writing `n`, `start`, `count`
    SendHeader,
    /// Writing the row payloads
    SendRows,
    /// Reading the 3-byte acknowledgment (coordinator side)
    ReceiveAck,
    /// Reading `n`, `start`, `count` (worker side)
    ReceiveHeader,
    /// Reading the row payloads (worker side)
    ReceiveRows,
    /// Writing the 3-byte acknowledgment (worker side)
    SendAck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::SendHeader => "send header",
            Stage::SendRows => "send rows",
            Stage::ReceiveAck => "receive ack",
            Stage::ReceiveHeader => "receive header",
            Stage::ReceiveRows => "receive rows",
            Stage::SendAck => "send ack",
        };
        f.write_str(name)
    }
}

/// Failure of a single session
///
/// A session error never escapes the session that produced it: the
/// coordinator records it against the worker and moves on.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Host name or address could not be resolved
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Every resolved address refused or failed the connection
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A bounded timeout expired
    #[error("timed out during {stage}")]
    Timeout { stage: Stage },

    /// Transport error, including short reads and writes
    #[error("{stage} failed: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// Peer answered with something other than `ack`
    #[error("unexpected acknowledgment {:?}", String::from_utf8_lossy(.0))]
    BadAck([u8; 3]),

    /// Header values that cannot describe a partition
    #[error("invalid partition header: n={n}, start={start}, count={count}")]
    InvalidHeader { n: i64, start: i64, count: i64 },

    /// The thread or runtime driving the session could not be started
    #[error("failed to start session: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },

    /// The thread driving the session panicked
    #[error("session thread panicked")]
    Panicked,
}

impl SessionError {
    /// Stage at which the session stopped
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SessionError::Resolve { .. } | SessionError::Connect { .. } => Some(Stage::Connect),
            SessionError::Timeout { stage } | SessionError::Io { stage, .. } => Some(*stage),
            SessionError::BadAck(_) => Some(Stage::ReceiveAck),
            SessionError::InvalidHeader { .. } => Some(Stage::ReceiveHeader),
            SessionError::Spawn { .. } | SessionError::Panicked => None,
        }
    }

    pub(crate) fn io(stage: Stage) -> impl FnOnce(io::Error) -> SessionError {
        move |source| SessionError::Io { stage, source }
    }
}

/// Partitioner precondition violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("cannot partition rows across zero workers")]
    NoWorkers,
}
