//! Mock filesystem and canned `/proc` trees for tests and non-Linux hosts.

mod filesystem;
pub mod scenarios;

pub use filesystem::MockFs;
