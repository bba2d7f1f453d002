//! Attribute sources for process handles.
//!
//! The procfs backend reads Linux `/proc`, `/dev` and `/etc/passwd` through
//! the [`FileSystem`] trait, so the same code runs against the real host or
//! an in-memory tree.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Process<B>                             │
//! │         cache, requested fields, CPU% tracker               │
//! └────────────────────────────┬────────────────────────────────┘
//!                              │ ProcessBackend (trait)
//!                       ┌──────▼──────┐
//!                       │ProcfsBackend│  /proc/[pid]/*, /dev, /etc
//!                       └──────┬──────┘
//!                              │ FileSystem (trait)
//!              ┌───────────────┼───────────────┐
//!              │               │               │
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use psmeta_core::collector::ProcfsBackend;
//! use psmeta_core::process::Process;
//!
//! let backend = ProcfsBackend::local();
//! let mut process = Process::new(std::process::id() as i32, &backend).unwrap();
//! println!("{}", process.name().unwrap());
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use psmeta_core::collector::{MockFs, ProcfsBackend, ProcfsConfig};
//! use psmeta_core::process::Process;
//!
//! let fs = MockFs::typical_system();
//! let backend = ProcfsBackend::new(fs, ProcfsConfig::default());
//! let mut process = Process::new(1000, &backend).unwrap();
//! assert_eq!(process.name().unwrap(), "bash");
//! ```

pub mod mock;
pub mod procfs;
pub mod traits;

pub use mock::MockFs;
pub use procfs::{ProcfsBackend, ProcfsConfig};
pub use traits::{FileSystem, RealFs};
