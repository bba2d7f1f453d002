use crate::collector::procfs::parser::ParseError;
use crate::process::field::Field;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for process attribute resolution.
#[derive(Debug)]
pub enum ProcessError {
    /// PID is not in the live process listing.
    NotRunning(i32),
    /// Field was not part of the set requested at construction.
    FieldNotRequested(Field),
    /// Differential CPU percent was asked of a restricted handle.
    RequiresUpdate,
    /// Attribute has no implementation on this platform.
    NotImplemented(&'static str),
    /// Process has no child processes.
    NoChildren,
    /// Process has no parent (PID 0 as parent).
    NoParent(i32),
    /// Access to a process file was denied.
    PermissionDenied { path: PathBuf },
    /// I/O error reading a process file.
    Io { path: PathBuf, source: io::Error },
    /// Malformed content in a process file.
    Parse { path: PathBuf, message: String },
}

impl ProcessError {
    /// Wraps an I/O error, separating out permission failures.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            ProcessError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            ProcessError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn parse(path: &Path, err: ParseError) -> Self {
        ProcessError::Parse {
            path: path.to_path_buf(),
            message: err.message,
        }
    }

    /// True when the process no longer exists (or never did).
    pub fn is_process_gone(&self) -> bool {
        match self {
            ProcessError::NotRunning(_) => true,
            ProcessError::Io { source, .. } => {
                source.kind() == io::ErrorKind::NotFound || is_no_such_process(source)
            }
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ProcessError::PermissionDenied { .. })
    }
}

/// ESRCH from a read racing the process exit.
#[cfg(unix)]
fn is_no_such_process(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn is_no_such_process(_err: &io::Error) -> bool {
    false
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::NotRunning(pid) => write!(f, "process {} not found", pid),
            ProcessError::FieldNotRequested(field) => {
                write!(f, "field {} was not requested at construction", field)
            }
            ProcessError::RequiresUpdate => {
                write!(f, "cpu percent needs an unrestricted process handle")
            }
            ProcessError::NotImplemented(what) => write!(f, "{} is not implemented", what),
            ProcessError::NoChildren => write!(f, "process does not have children"),
            ProcessError::NoParent(pid) => write!(f, "process {} has no parent", pid),
            ProcessError::PermissionDenied { path } => {
                write!(f, "permission denied: {}", path.display())
            }
            ProcessError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            ProcessError::Parse { path, message } => {
                write!(f, "parse error in {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_splits_permission_denied() {
        let path = Path::new("/proc/1/io");

        let denied = ProcessError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(denied.is_permission_denied());
        assert!(!denied.is_process_gone());

        let gone = ProcessError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(gone.is_process_gone());
        assert!(!gone.is_permission_denied());
        assert!(std::error::Error::source(&gone).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_esrch_counts_as_gone() {
        let path = Path::new("/proc/1000/stat");
        let err = ProcessError::from_io(path, io::Error::from_raw_os_error(libc::ESRCH));
        assert!(err.is_process_gone());

        let other = ProcessError::from_io(path, io::Error::from_raw_os_error(libc::EIO));
        assert!(!other.is_process_gone());
    }

    #[test]
    fn test_display() {
        let err = ProcessError::FieldNotRequested(Field::MemoryInfoEx);
        assert_eq!(
            err.to_string(),
            "field MemoryInfoEx was not requested at construction"
        );

        let err = ProcessError::parse(Path::new("/proc/1/stat"), ParseError::new("missing ')'"));
        assert_eq!(err.to_string(), "parse error in /proc/1/stat: missing ')'");
    }
}
