//! Where the procfs backend reads from and the host constants it needs.

use std::path::PathBuf;

/// Clock ticks per second (USER_HZ) when `sysconf` is unavailable.
pub const DEFAULT_CLOCK_TICKS: u64 = 100;

/// Page size in bytes when `sysconf` is unavailable.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Backend configuration.
///
/// Paths can be redirected with `HOST_PROC`, `HOST_DEV` and `HOST_ETC`,
/// for example when the host filesystem is mounted into a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcfsConfig {
    pub proc_path: PathBuf,
    pub dev_path: PathBuf,
    pub etc_path: PathBuf,
    pub clock_ticks: u64,
    pub page_size: u64,
    /// Overrides the CPU count from `/proc/stat`.
    pub num_cpus: Option<usize>,
    /// Ask the kernel for the live nice value with `getpriority(2)` instead
    /// of using the one in `/proc/[pid]/stat`.
    pub live_priority: bool,
}

impl Default for ProcfsConfig {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            dev_path: PathBuf::from("/dev"),
            etc_path: PathBuf::from("/etc"),
            clock_ticks: DEFAULT_CLOCK_TICKS,
            page_size: DEFAULT_PAGE_SIZE,
            num_cpus: None,
            live_priority: false,
        }
    }
}

impl ProcfsConfig {
    /// Configuration for the running host: paths from the environment,
    /// constants from `sysconf`.
    pub fn from_env() -> Self {
        let host = HostParams::detect();
        Self {
            clock_ticks: host.clock_ticks,
            page_size: host.page_size,
            live_priority: cfg!(target_os = "linux"),
            ..Self::from_lookup(|key| std::env::var(key).ok())
        }
    }

    /// Builds the default configuration with paths taken from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            proc_path: path("HOST_PROC", "/proc"),
            dev_path: path("HOST_DEV", "/dev"),
            etc_path: path("HOST_ETC", "/etc"),
            ..Self::default()
        }
    }

    pub fn with_proc_path(mut self, proc_path: impl Into<PathBuf>) -> Self {
        self.proc_path = proc_path.into();
        self
    }

    pub fn with_num_cpus(mut self, num_cpus: usize) -> Self {
        self.num_cpus = Some(num_cpus);
        self
    }
}

/// Host constants queried once per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostParams {
    pub clock_ticks: u64,
    pub page_size: u64,
}

impl Default for HostParams {
    fn default() -> Self {
        Self {
            clock_ticks: DEFAULT_CLOCK_TICKS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl HostParams {
    /// Reads the constants from `sysconf`, falling back to the defaults.
    #[cfg(unix)]
    pub fn detect() -> Self {
        // SAFETY: sysconf only reads a configuration value.
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        // SAFETY: as above.
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

        let defaults = Self::default();
        Self {
            clock_ticks: u64::try_from(ticks)
                .ok()
                .filter(|t| *t > 0)
                .unwrap_or(defaults.clock_ticks),
            page_size: u64::try_from(page)
                .ok()
                .filter(|p| *p > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    #[cfg(not(unix))]
    pub fn detect() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_defaults() {
        let config = ProcfsConfig::from_lookup(|_| None);
        assert_eq!(config, ProcfsConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let env: HashMap<&str, &str> = [("HOST_PROC", "/host/proc"), ("HOST_ETC", "")]
            .into_iter()
            .collect();
        let config = ProcfsConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.proc_path, PathBuf::from("/host/proc"));
        assert_eq!(config.dev_path, PathBuf::from("/dev"));
        // empty values fall back to the default
        assert_eq!(config.etc_path, PathBuf::from("/etc"));
    }

    #[test]
    fn test_builders() {
        let config = ProcfsConfig::default()
            .with_proc_path("/tmp/proc")
            .with_num_cpus(8);
        assert_eq!(config.proc_path, PathBuf::from("/tmp/proc"));
        assert_eq!(config.num_cpus, Some(8));
    }

    #[test]
    fn test_detect_is_positive() {
        let host = HostParams::detect();
        assert!(host.clock_ticks > 0);
        assert!(host.page_size > 0);
    }
}
