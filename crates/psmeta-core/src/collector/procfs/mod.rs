//! Linux `/proc` backend.
//!
//! This module provides parsers for the `/proc` text formats and the
//! [`ProcfsBackend`] that turns them into process attributes.

mod backend;
mod config;
pub mod parser;

pub use backend::ProcfsBackend;
pub use config::{HostParams, ProcfsConfig};
pub use parser::{ParseError, UserResolver};
