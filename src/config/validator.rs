//! Configuration validation
//!
//! Everything rejected here is a fatal configuration error: the process
//! reports it and exits before any network activity.

use super::*;
use anyhow::Result;

/// Validate settings shared by both roles
pub fn validate_config(config: &Config) -> Result<()> {
    validate_dispatch(&config.dispatch)?;
    validate_worker(&config.worker)?;
    Ok(())
}

/// Validate dispatch settings
pub fn validate_dispatch(dispatch: &DispatchConfig) -> Result<()> {
    if dispatch.max_workers == 0 {
        anyhow::bail!("max_workers must be at least 1");
    }
    if dispatch.connect_timeout_ms == Some(0) {
        anyhow::bail!("connect_timeout_ms must be greater than 0");
    }
    if dispatch.io_timeout_ms == Some(0) {
        anyhow::bail!("io_timeout_ms must be greater than 0");
    }
    Ok(())
}

/// Validate worker settings
pub fn validate_worker(worker: &WorkerConfig) -> Result<()> {
    if worker.io_timeout_ms == Some(0) {
        anyhow::bail!("io_timeout_ms must be greater than 0");
    }
    Ok(())
}

/// Validate everything the coordinator role needs before dispatch
///
/// Returns the matrix size as `usize`.
pub fn validate_coordinator(config: &Config, matrix_size: u64, roster: &Roster) -> Result<usize> {
    if matrix_size == 0 {
        anyhow::bail!("Matrix size must be at least 1");
    }
    if matrix_size > i32::MAX as u64 {
        anyhow::bail!(
            "Matrix size {} does not fit the wire format (max {})",
            matrix_size,
            i32::MAX
        );
    }
    if roster.is_empty() {
        anyhow::bail!("No workers found in roster file {}", config.roster.display());
    }
    if roster.len() > config.dispatch.max_workers {
        anyhow::bail!(
            "Roster lists {} workers, more than max_workers ({})",
            roster.len(),
            config.dispatch.max_workers
        );
    }

    usize::try_from(matrix_size)
        .map_err(|_| anyhow::anyhow!("Matrix size {} is too large for this platform", matrix_size))
}

/// Validate everything the worker role needs before listening
pub fn validate_worker_role<'a>(config: &Config, roster: &'a Roster) -> Result<&'a CoordinatorEntry> {
    roster.coordinator.as_ref().ok_or_else(|| {
        anyhow::anyhow!(
            "No coordinator (master) found in roster file {}",
            config.roster.display()
        )
    })
}
