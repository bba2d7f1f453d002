//! The OS seam: everything a [`Process`](crate::process::Process) needs
//! from the operating system, one method per attribute source.

use crate::process::error::ProcessError;
use crate::process::types::{
    ConnectionStat, CpuTimes, IoCountersStat, MemoryInfoExStat, MemoryInfoStat, MemoryMapsStat,
    NetIoCountersStat, NumCtxSwitchesStat, OpenFilesStat, PageFaultsStat, RlimitStat,
    SignalInfoStat,
};
use std::collections::HashMap;

/// Scheduling and accounting data of one process or thread.
///
/// Source: `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatInfo {
    pub name: String,
    pub state: String,
    pub ppid: i32,
    pub pgid: i32,
    pub tpgid: i32,
    /// Controlling terminal device number (`tty_nr`).
    pub terminal: u64,
    pub cpu_times: CpuTimes,
    /// Start time, milliseconds since the epoch.
    pub create_time: i64,
    pub nice: i32,
    pub rt_priority: i32,
    pub num_threads: i32,
    pub page_faults: PageFaultsStat,
}

/// Identity, memory and signal data of one process.
///
/// Source: `/proc/[pid]/status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusInfo {
    /// Short name, possibly truncated by the kernel to 15 bytes.
    pub name: String,
    pub state: String,
    pub ppid: i32,
    pub tgid: i32,
    pub uids: Vec<u32>,
    pub gids: Vec<u32>,
    pub num_threads: i32,
    pub ctx_switches: NumCtxSwitchesStat,
    pub memory: MemoryInfoStat,
    pub signals: SignalInfoStat,
}

/// Source of raw process attributes.
///
/// Implementations do no caching of per-process data; the handle owns
/// that policy.
pub trait ProcessBackend {
    /// PIDs of all live processes, in no particular order.
    fn pids(&self) -> Result<Vec<i32>, ProcessError>;

    fn pid_exists(&self, pid: i32) -> Result<bool, ProcessError> {
        Ok(self.pids()?.contains(&pid))
    }

    fn stat(&self, pid: i32) -> Result<StatInfo, ProcessError>;

    fn status(&self, pid: i32) -> Result<StatusInfo, ProcessError>;

    fn statm(&self, pid: i32) -> Result<MemoryInfoExStat, ProcessError>;

    fn io_counters(&self, pid: i32) -> Result<IoCountersStat, ProcessError>;

    /// Command line arguments; empty for kernel threads and zombies.
    fn cmdline(&self, pid: i32) -> Result<Vec<String>, ProcessError>;

    fn cwd(&self, pid: i32) -> Result<String, ProcessError>;

    fn exe(&self, pid: i32) -> Result<String, ProcessError>;

    /// Names of the open file descriptors.
    fn fd_list(&self, pid: i32) -> Result<Vec<String>, ProcessError>;

    /// Targets of the given descriptors. Descriptors whose target cannot be
    /// read are skipped.
    fn open_files(&self, pid: i32, fds: &[String]) -> Result<Vec<OpenFilesStat>, ProcessError>;

    /// Sockets among the given descriptors, matched against the process'
    /// network tables.
    fn connections(&self, pid: i32, fds: &[String]) -> Result<Vec<ConnectionStat>, ProcessError>;

    fn thread_ids(&self, pid: i32) -> Result<Vec<i32>, ProcessError>;

    fn thread_stat(&self, pid: i32, tid: i32) -> Result<StatInfo, ProcessError>;

    fn memory_maps(&self, pid: i32) -> Result<Vec<MemoryMapsStat>, ProcessError>;

    /// Resource limits with `used` left at zero.
    fn limits(&self, pid: i32) -> Result<Vec<RlimitStat>, ProcessError>;

    /// Per-interface counters of the process' network namespace.
    fn net_io_counters(&self, pid: i32) -> Result<Vec<NetIoCountersStat>, ProcessError>;

    /// Terminal device number to terminal name.
    fn terminal_map(&self) -> Result<HashMap<u64, String>, ProcessError>;

    fn username(&self, uid: u32) -> Result<String, ProcessError>;

    /// Total machine memory in bytes.
    fn total_memory(&self) -> Result<u64, ProcessError>;

    /// Number of online CPUs, at least 1.
    fn num_cpus(&self) -> usize;
}

impl<B: ProcessBackend + ?Sized> ProcessBackend for &B {
    fn pids(&self) -> Result<Vec<i32>, ProcessError> {
        (**self).pids()
    }

    fn pid_exists(&self, pid: i32) -> Result<bool, ProcessError> {
        (**self).pid_exists(pid)
    }

    fn stat(&self, pid: i32) -> Result<StatInfo, ProcessError> {
        (**self).stat(pid)
    }

    fn status(&self, pid: i32) -> Result<StatusInfo, ProcessError> {
        (**self).status(pid)
    }

    fn statm(&self, pid: i32) -> Result<MemoryInfoExStat, ProcessError> {
        (**self).statm(pid)
    }

    fn io_counters(&self, pid: i32) -> Result<IoCountersStat, ProcessError> {
        (**self).io_counters(pid)
    }

    fn cmdline(&self, pid: i32) -> Result<Vec<String>, ProcessError> {
        (**self).cmdline(pid)
    }

    fn cwd(&self, pid: i32) -> Result<String, ProcessError> {
        (**self).cwd(pid)
    }

    fn exe(&self, pid: i32) -> Result<String, ProcessError> {
        (**self).exe(pid)
    }

    fn fd_list(&self, pid: i32) -> Result<Vec<String>, ProcessError> {
        (**self).fd_list(pid)
    }

    fn open_files(&self, pid: i32, fds: &[String]) -> Result<Vec<OpenFilesStat>, ProcessError> {
        (**self).open_files(pid, fds)
    }

    fn connections(&self, pid: i32, fds: &[String]) -> Result<Vec<ConnectionStat>, ProcessError> {
        (**self).connections(pid, fds)
    }

    fn thread_ids(&self, pid: i32) -> Result<Vec<i32>, ProcessError> {
        (**self).thread_ids(pid)
    }

    fn thread_stat(&self, pid: i32, tid: i32) -> Result<StatInfo, ProcessError> {
        (**self).thread_stat(pid, tid)
    }

    fn memory_maps(&self, pid: i32) -> Result<Vec<MemoryMapsStat>, ProcessError> {
        (**self).memory_maps(pid)
    }

    fn limits(&self, pid: i32) -> Result<Vec<RlimitStat>, ProcessError> {
        (**self).limits(pid)
    }

    fn net_io_counters(&self, pid: i32) -> Result<Vec<NetIoCountersStat>, ProcessError> {
        (**self).net_io_counters(pid)
    }

    fn terminal_map(&self) -> Result<HashMap<u64, String>, ProcessError> {
        (**self).terminal_map()
    }

    fn username(&self, uid: u32) -> Result<String, ProcessError> {
        (**self).username(uid)
    }

    fn total_memory(&self) -> Result<u64, ProcessError> {
        (**self).total_memory()
    }

    fn num_cpus(&self) -> usize {
        (**self).num_cpus()
    }
}
