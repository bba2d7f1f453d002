//! Process handles and the enumeration helpers built on them.
//!
//! A [`Process`] reads attributes through a [`ProcessBackend`]. Handles
//! created with [`Process::with_fields`] (or [`processes_with_fields`])
//! resolve everything up front and answer from cache afterwards.

pub mod backend;
mod cache;
pub mod error;
pub mod field;
mod handle;
pub mod prefetch;
pub mod sample;
mod snapshot;
pub mod types;

pub use backend::{ProcessBackend, StatInfo, StatusInfo};
pub use error::ProcessError;
pub use field::{Field, Resolver, UnknownField};
pub use handle::Process;
pub use snapshot::ProcessSnapshot;
pub use types::*;

use tracing::{debug, warn};

/// Live PIDs in ascending order.
pub fn pids<B: ProcessBackend>(backend: &B) -> Result<Vec<i32>, ProcessError> {
    let mut pids = backend.pids()?;
    pids.sort_unstable();
    Ok(pids)
}

pub fn pid_exists<B: ProcessBackend>(backend: &B, pid: i32) -> Result<bool, ProcessError> {
    backend.pid_exists(pid)
}

/// Unrestricted handles for every live process.
///
/// Processes that exit or deny access while being opened are skipped.
pub fn processes<B: ProcessBackend>(backend: &B) -> Result<Vec<Process<&B>>, ProcessError> {
    collect(backend, |pid| Process::new(pid, backend))
}

/// Restricted handles for every live process, each prefetched with
/// `fields`.
///
/// Machine memory is read once for all handles when `MemoryPercent` is
/// requested.
pub fn processes_with_fields<'a, B: ProcessBackend>(
    backend: &'a B,
    fields: &[Field],
) -> Result<Vec<Process<&'a B>>, ProcessError> {
    let machine_memory = if fields.contains(&Field::MemoryPercent) {
        Some(backend.total_memory()?)
    } else {
        None
    };

    collect(backend, |pid| match machine_memory {
        Some(total) => Process::with_machine_memory(pid, backend, fields, total),
        None => Process::with_fields(pid, backend, fields),
    })
}

fn collect<'a, B: ProcessBackend>(
    backend: &'a B,
    mut open: impl FnMut(i32) -> Result<Process<&'a B>, ProcessError>,
) -> Result<Vec<Process<&'a B>>, ProcessError> {
    let pids = pids(backend)?;
    let mut processes = Vec::with_capacity(pids.len());

    for pid in pids {
        match open(pid) {
            Ok(process) => processes.push(process),
            Err(e) if e.is_process_gone() || e.is_permission_denied() => {
                debug!(pid, error = %e, "skipping process");
            }
            Err(e) => warn!(pid, error = %e, "failed to read process"),
        }
    }

    debug!(count = processes.len(), "enumerated processes");
    Ok(processes)
}
