//! Process metadata for Linux.
//!
//! [`process::Process`] resolves attributes of one process from `/proc`:
//! command line, memory, IO counters, limits, CPU times and more. A handle
//! can be restricted to a set of [`process::Field`]s that are all read at
//! construction, after which reads are cache lookups.

pub mod collector;
pub mod process;

pub use collector::{FileSystem, MockFs, ProcfsBackend, ProcfsConfig, RealFs};
pub use process::{Field, Process, ProcessBackend, ProcessError, ProcessSnapshot};
