//! Shared utilities

pub mod affinity;
pub mod logging;
pub mod time;
