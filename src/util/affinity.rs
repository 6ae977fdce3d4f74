//! CPU affinity binding
//!
//! Pinning is a placement hint for session threads. Callers treat failure as
//! non-fatal: a thread that cannot be pinned still runs its session.
//!
//! # Platform Support
//!
//! CPU affinity is supported on Linux via `sched_setaffinity`. On other
//! platforms `set_cpu_affinity` returns an error.
//!
//! # Example
//!
//! ```no_run
//! use rowcast::util::affinity::{dispatch_core, set_cpu_affinity};
//!
//! // Pin the session thread for worker 3 on a 12-core host
//! set_cpu_affinity(&[dispatch_core(3, 12)]).unwrap();
//! ```

use crate::Result;
use anyhow::Context;

/// Set CPU affinity for the current thread
///
/// Binds the current thread to the specified CPU cores.
///
/// # Errors
///
/// Returns an error if the core list is empty, a core ID is out of range,
/// the syscall fails, or the platform has no affinity support.
#[cfg(target_os = "linux")]
pub fn set_cpu_affinity(cores: &[usize]) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    if cores.is_empty() {
        anyhow::bail!("CPU core list cannot be empty");
    }

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);

        for &core in cores {
            if core >= 1024 {
                anyhow::bail!("CPU core ID {} is too large (max 1023)", core);
            }
            CPU_SET(core, &mut cpu_set);
        }

        let result = sched_setaffinity(
            0, // 0 = current thread
            mem::size_of::<cpu_set_t>(),
            &cpu_set,
        );

        if result != 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("Failed to set CPU affinity to cores {:?}", cores));
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_cpu_affinity(_cores: &[usize]) -> Result<()> {
    anyhow::bail!("CPU affinity is only supported on Linux")
}

/// Pin the current thread to one core, logging instead of failing
pub fn pin_current_thread(core: usize) {
    match set_cpu_affinity(&[core]) {
        Ok(()) => tracing::debug!(core, "pinned thread"),
        Err(e) => tracing::warn!(core, "could not pin thread: {:#}", e),
    }
}

/// Get the number of available CPU cores
pub fn available_cpus() -> usize {
    num_cpus::get()
}

/// Core for the session thread serving worker `index`
///
/// Cycles over `cpus - 1` cores, leaving the last one for the coordinator's
/// own thread. On a single-core host every thread lands on core 0.
pub fn dispatch_core(index: usize, cpus: usize) -> usize {
    index % cpus.saturating_sub(1).max(1)
}
