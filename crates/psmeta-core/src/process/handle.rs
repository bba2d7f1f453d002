use crate::process::backend::{ProcessBackend, StatInfo, StatusInfo};
use crate::process::cache::{AttributeCache, fill};
use crate::process::error::ProcessError;
use crate::process::field::{Field, Resolver};
use crate::process::prefetch;
use crate::process::sample::{self, CpuPercentTracker, CpuSample};
use crate::process::types::{
    ConnectionStat, CpuTimes, IoCountersStat, MemoryInfoExStat, MemoryInfoStat, MemoryMapsStat,
    NetIoCountersStat, NumCtxSwitchesStat, OpenFilesStat, PageFaultsStat, RLIMIT_AS, RLIMIT_CPU,
    RLIMIT_DATA, RLIMIT_MEMLOCK, RLIMIT_NICE, RLIMIT_NOFILE, RLIMIT_RSS, RLIMIT_RTPRIO,
    RLIMIT_SIGPENDING, RLIMIT_STACK, RlimitStat, SignalInfoStat,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::trace;

/// Length at which the kernel truncates the short process name.
const COMM_LEN: usize = 15;

/// Handle to one process.
///
/// An unrestricted handle (`Process::new`) re-reads the backend on every
/// call. A restricted handle (`Process::with_fields`) resolves its fields
/// once at construction and answers from cache afterwards; other fields
/// fail with [`ProcessError::FieldNotRequested`].
pub struct Process<B: ProcessBackend> {
    pid: i32,
    backend: B,
    name: Option<String>,
    create_time: i64,
    machine_memory: Option<u64>,
    requested: Option<BTreeSet<Field>>,
    cache: AttributeCache,
    tracker: CpuPercentTracker,
}

impl<B: ProcessBackend> Process<B> {
    /// Creates an unrestricted handle.
    pub fn new(pid: i32, backend: B) -> Result<Self, ProcessError> {
        Self::build(pid, backend, None, None)
    }

    /// Creates a handle restricted to `fields` and resolves all of them.
    pub fn with_fields(pid: i32, backend: B, fields: &[Field]) -> Result<Self, ProcessError> {
        Self::build(pid, backend, Some(fields), None)
    }

    /// Like [`with_fields`](Self::with_fields), with a machine memory total
    /// shared between many handles.
    pub fn with_machine_memory(
        pid: i32,
        backend: B,
        fields: &[Field],
        machine_memory: u64,
    ) -> Result<Self, ProcessError> {
        Self::build(pid, backend, Some(fields), Some(machine_memory))
    }

    pub(crate) fn build(
        pid: i32,
        backend: B,
        fields: Option<&[Field]>,
        machine_memory: Option<u64>,
    ) -> Result<Self, ProcessError> {
        if !backend.pid_exists(pid)? {
            return Err(ProcessError::NotRunning(pid));
        }

        let mut process = Self {
            pid,
            backend,
            name: None,
            create_time: 0,
            machine_memory,
            requested: fields.map(|fields| fields.iter().copied().collect()),
            cache: AttributeCache::default(),
            tracker: CpuPercentTracker::new(),
        };
        process.create_time = process.stat_info()?.create_time;

        if let Some(fields) = fields {
            prefetch::run(&mut process, fields)?;
        }

        Ok(process)
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fields this handle was restricted to, `None` when unrestricted.
    pub fn requested_fields(&self) -> Option<&BTreeSet<Field>> {
        self.requested.as_ref()
    }

    pub fn is_restricted(&self) -> bool {
        self.requested.is_some()
    }

    fn frozen(&self) -> bool {
        self.requested.is_some()
    }

    fn check(&self, field: Field) -> Result<(), ProcessError> {
        match &self.requested {
            Some(requested) if !requested.contains(&field) => {
                Err(ProcessError::FieldNotRequested(field))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn is_resolved(&self, resolver: Resolver) -> bool {
        self.cache.is_populated(resolver)
    }

    /// Fills the cache slot behind `resolver`.
    pub(crate) fn resolve(&mut self, resolver: Resolver) -> Result<(), ProcessError> {
        match resolver {
            Resolver::Cmdline => self.cmdline_args().map(|_| ()),
            Resolver::Stat => self.stat_info().map(|_| ()),
            Resolver::Cwd => self.cwd_path().map(|_| ()),
            Resolver::Exe => self.exe_path().map(|_| ()),
            Resolver::FdList => self.fd_names().map(|_| ()),
            Resolver::OpenFiles => self.open_file_list().map(|_| ()),
            Resolver::Connections => self.connection_list().map(|_| ()),
            Resolver::Io => self.io_info().map(|_| ()),
            Resolver::Statm => self.statm_info().map(|_| ()),
            Resolver::Status => self.status_info().map(|_| ()),
            Resolver::Threads => self.thread_times().map(|_| ()),
            Resolver::MemoryMaps => self.memory_map_list().map(|_| ()),
            Resolver::MemoryMapsGrouped => self.memory_maps_summary().map(|_| ()),
            Resolver::Limits => self.limit_list().map(|_| ()),
            Resolver::RlimitUsage => self.rlimit_usage_list().map(|_| ()),
            Resolver::Terminal => self.terminal_name().map(|_| ()),
            Resolver::NetIo => self.net_io_total().map(|_| ()),
            Resolver::NetIoPerNic => self.net_io_nics().map(|_| ()),
            Resolver::Username => self.user_name().map(|_| ()),
            Resolver::IsRunning => self.running().map(|_| ()),
            Resolver::CpuPercent => self.lifetime_cpu_percent().map(|_| ()),
            Resolver::MemoryPercent => self.memory_percent_value().map(|_| ()),
        }
    }

    // Cache slots. Each one either answers from a frozen slot or reads the
    // backend, computing its dependencies first.

    fn stat_info(&mut self) -> Result<&StatInfo, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.stat, frozen, || backend.stat(pid))
    }

    fn status_info(&mut self) -> Result<&StatusInfo, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.status, frozen, || {
            let mut status = backend.status(pid)?;
            if status.name.len() >= COMM_LEN {
                let args = backend.cmdline(pid)?;
                if let Some(name) = widen_name(&status.name, &args) {
                    status.name = name;
                }
            }
            Ok(status)
        })
    }

    fn statm_info(&mut self) -> Result<&MemoryInfoExStat, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.statm, frozen, || backend.statm(pid))
    }

    fn cmdline_args(&mut self) -> Result<&Vec<String>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.cmdline, frozen, || backend.cmdline(pid))
    }

    fn cwd_path(&mut self) -> Result<&String, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.cwd, frozen, || backend.cwd(pid))
    }

    fn exe_path(&mut self) -> Result<&String, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.exe, frozen, || backend.exe(pid))
    }

    fn fd_names(&mut self) -> Result<&Vec<String>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.fd_list, frozen, || backend.fd_list(pid))
    }

    fn open_file_list(&mut self) -> Result<&Vec<OpenFilesStat>, ProcessError> {
        let frozen = self.frozen();
        let fds = self.fd_names()?.clone();
        let (backend, pid) = (&self.backend, self.pid);
        fill(&mut self.cache.open_files, frozen, || backend.open_files(pid, &fds))
    }

    fn connection_list(&mut self) -> Result<&Vec<ConnectionStat>, ProcessError> {
        let frozen = self.frozen();
        let fds = self.fd_names()?.clone();
        let (backend, pid) = (&self.backend, self.pid);
        fill(&mut self.cache.connections, frozen, || backend.connections(pid, &fds))
    }

    fn io_info(&mut self) -> Result<&IoCountersStat, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.io, frozen, || backend.io_counters(pid))
    }

    fn thread_times(&mut self) -> Result<&BTreeMap<i32, CpuTimes>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.threads, frozen, || {
            let mut threads = BTreeMap::new();
            for tid in backend.thread_ids(pid)? {
                match backend.thread_stat(pid, tid) {
                    Ok(stat) => {
                        threads.insert(tid, stat.cpu_times);
                    }
                    Err(e) if e.is_process_gone() => trace!(pid, tid, "thread exited during scan"),
                    Err(e) => return Err(e),
                }
            }
            Ok(threads)
        })
    }

    fn memory_map_list(&mut self) -> Result<&Vec<MemoryMapsStat>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.memory_maps, frozen, || backend.memory_maps(pid))
    }

    fn memory_maps_summary(&mut self) -> Result<&MemoryMapsStat, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.memory_maps_grouped, frozen, || {
            Ok(MemoryMapsStat::grouped(&backend.memory_maps(pid)?))
        })
    }

    fn limit_list(&mut self) -> Result<&Vec<RlimitStat>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.limits, frozen, || backend.limits(pid))
    }

    fn rlimit_usage_list(&mut self) -> Result<&Vec<RlimitStat>, ProcessError> {
        let frozen = self.frozen();
        let stat = self.stat_info()?.clone();
        let num_fds = self.fd_names()?.len() as u64;
        let status = self.status_info()?.clone();
        let limits = self.limit_list()?.clone();
        fill(&mut self.cache.rlimit_usage, frozen, move || {
            Ok(with_usage(limits, &stat, &status, num_fds))
        })
    }

    fn terminal_name(&mut self) -> Result<&String, ProcessError> {
        let frozen = self.frozen();
        let tty = self.stat_info()?.terminal;
        let backend = &self.backend;
        fill(&mut self.cache.terminal, frozen, || {
            Ok(backend.terminal_map()?.remove(&tty).unwrap_or_default())
        })
    }

    fn net_io_total(&mut self) -> Result<&NetIoCountersStat, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.net_io, frozen, || {
            Ok(NetIoCountersStat::aggregate(&backend.net_io_counters(pid)?))
        })
    }

    fn net_io_nics(&mut self) -> Result<&Vec<NetIoCountersStat>, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        fill(&mut self.cache.net_io_per_nic, frozen, || {
            backend.net_io_counters(pid)
        })
    }

    fn user_name(&mut self) -> Result<&String, ProcessError> {
        let frozen = self.frozen();
        let uid = self.status_info()?.uids.first().copied();
        let backend = &self.backend;
        fill(&mut self.cache.username, frozen, || match uid {
            Some(uid) => backend.username(uid),
            None => Err(ProcessError::NotImplemented("username without a uid")),
        })
    }

    fn running(&mut self) -> Result<&bool, ProcessError> {
        let (backend, pid, frozen) = (&self.backend, self.pid, self.frozen());
        let created = self.create_time;
        fill(&mut self.cache.is_running, frozen, || {
            if !backend.pid_exists(pid)? {
                return Ok(false);
            }
            match backend.stat(pid) {
                Ok(stat) => Ok(stat.create_time == created),
                Err(e) if e.is_process_gone() => Ok(false),
                Err(e) => Err(e),
            }
        })
    }

    fn lifetime_cpu_percent(&mut self) -> Result<&f64, ProcessError> {
        let frozen = self.frozen();
        let total = self.stat_info()?.cpu_times.total();
        let created = self.create_time;
        fill(&mut self.cache.cpu_percent, frozen, || {
            let now = chrono::Utc::now().timestamp_millis();
            Ok(sample::lifetime_percent(total, created, now))
        })
    }

    fn memory_percent_value(&mut self) -> Result<&f32, ProcessError> {
        let frozen = self.frozen();
        let rss = self.statm_info()?.rss;
        let (backend, machine_memory) = (&self.backend, self.machine_memory);
        fill(&mut self.cache.memory_percent, frozen, || {
            let total = match machine_memory {
                Some(total) => total,
                None => backend.total_memory()?,
            };
            Ok(sample::memory_percent(rss, total))
        })
    }

    // Public accessors.

    /// Process name, widened from the command line when the kernel
    /// truncated it.
    pub fn name(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Name)?;
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        let name = self.status_info()?.name.clone();
        self.name = Some(name.clone());
        Ok(name)
    }

    /// Start time in milliseconds since the epoch.
    pub fn create_time(&self) -> Result<i64, ProcessError> {
        self.check(Field::CreateTime)?;
        Ok(self.create_time)
    }

    /// Command line joined with spaces.
    pub fn cmdline(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Cmdline)?;
        Ok(self.cmdline_args()?.join(" "))
    }

    pub fn cmdline_slice(&mut self) -> Result<Vec<String>, ProcessError> {
        self.check(Field::CmdlineSlice)?;
        self.cmdline_args().cloned()
    }

    pub fn cwd(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Cwd)?;
        self.cwd_path().cloned()
    }

    pub fn exe(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Exe)?;
        self.exe_path().cloned()
    }

    /// Single-letter process state (`R`, `S`, `Z`, ...).
    pub fn status(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Status)?;
        Ok(self.status_info()?.state.clone())
    }

    pub fn ppid(&mut self) -> Result<i32, ProcessError> {
        self.check(Field::Ppid)?;
        Ok(self.stat_info()?.ppid)
    }

    pub fn tgid(&mut self) -> Result<i32, ProcessError> {
        self.check(Field::Tgid)?;
        Ok(self.status_info()?.tgid)
    }

    /// Real, effective, saved and filesystem UIDs.
    pub fn uids(&mut self) -> Result<Vec<u32>, ProcessError> {
        self.check(Field::Uids)?;
        Ok(self.status_info()?.uids.clone())
    }

    pub fn gids(&mut self) -> Result<Vec<u32>, ProcessError> {
        self.check(Field::Gids)?;
        Ok(self.status_info()?.gids.clone())
    }

    pub fn num_threads(&mut self) -> Result<i32, ProcessError> {
        self.check(Field::NumThreads)?;
        Ok(self.status_info()?.num_threads)
    }

    pub fn num_ctx_switches(&mut self) -> Result<NumCtxSwitchesStat, ProcessError> {
        self.check(Field::NumCtxSwitches)?;
        Ok(self.status_info()?.ctx_switches.clone())
    }

    pub fn signals(&mut self) -> Result<SignalInfoStat, ProcessError> {
        self.check(Field::Status)?;
        Ok(self.status_info()?.signals.clone())
    }

    pub fn nice(&mut self) -> Result<i32, ProcessError> {
        self.check(Field::Nice)?;
        Ok(self.stat_info()?.nice)
    }

    pub fn times(&mut self) -> Result<CpuTimes, ProcessError> {
        self.check(Field::Times)?;
        Ok(self.stat_info()?.cpu_times.clone())
    }

    pub fn page_faults(&mut self) -> Result<PageFaultsStat, ProcessError> {
        self.check(Field::PageFaults)?;
        Ok(self.stat_info()?.page_faults.clone())
    }

    /// True when the process group is the terminal's foreground group.
    pub fn foreground(&mut self) -> Result<bool, ProcessError> {
        self.check(Field::Foreground)?;
        let stat = self.stat_info()?;
        Ok(stat.pgid == stat.tpgid)
    }

    pub fn background(&mut self) -> Result<bool, ProcessError> {
        self.check(Field::Background)?;
        let stat = self.stat_info()?;
        Ok(stat.pgid != stat.tpgid)
    }

    /// True while the PID is live and still has the same start time.
    pub fn is_running(&mut self) -> Result<bool, ProcessError> {
        self.check(Field::IsRunning)?;
        self.running().copied()
    }

    pub fn io_counters(&mut self) -> Result<IoCountersStat, ProcessError> {
        self.check(Field::IoCounters)?;
        self.io_info().cloned()
    }

    pub fn num_fds(&mut self) -> Result<usize, ProcessError> {
        self.check(Field::NumFds)?;
        Ok(self.fd_names()?.len())
    }

    pub fn open_files(&mut self) -> Result<Vec<OpenFilesStat>, ProcessError> {
        self.check(Field::OpenFiles)?;
        self.open_file_list().cloned()
    }

    pub fn memory_info(&mut self) -> Result<MemoryInfoStat, ProcessError> {
        self.check(Field::MemoryInfo)?;
        let (rss, vms) = {
            let statm = self.statm_info()?;
            (statm.rss, statm.vms)
        };
        let mut info = self.status_info()?.memory.clone();
        info.rss = rss;
        info.vms = vms;
        Ok(info)
    }

    pub fn memory_info_ex(&mut self) -> Result<MemoryInfoExStat, ProcessError> {
        self.check(Field::MemoryInfoEx)?;
        self.statm_info().cloned()
    }

    /// Memory mappings, or one summed record when `grouped`.
    pub fn memory_maps(&mut self, grouped: bool) -> Result<Vec<MemoryMapsStat>, ProcessError> {
        if grouped {
            self.check(Field::MemoryMapsGrouped)?;
            Ok(vec![self.memory_maps_summary()?.clone()])
        } else {
            self.check(Field::MemoryMaps)?;
            self.memory_map_list().cloned()
        }
    }

    /// Resident memory as a percentage of machine memory.
    pub fn memory_percent(&mut self) -> Result<f32, ProcessError> {
        self.check(Field::MemoryPercent)?;
        self.memory_percent_value().copied()
    }

    /// CPU percent since the previous call (`interval` zero) or over
    /// `interval` (blocking).
    ///
    /// The first non-blocking call has no reference sample and returns `0`.
    /// Only available on unrestricted handles.
    pub fn cpu_percent(&mut self, interval: Duration) -> Result<f64, ProcessError> {
        if self.is_restricted() {
            return Err(ProcessError::RequiresUpdate);
        }

        let num_cpu = self.backend.num_cpus();
        let first = self.cpu_sample()?;
        if interval.is_zero() {
            return Ok(self.tracker.observe(first, num_cpu));
        }

        std::thread::sleep(interval);
        let second = self.cpu_sample()?;
        let percent = sample::calculate_percent(&first, &second, num_cpu);
        self.tracker.store(second);
        Ok(percent)
    }

    fn cpu_sample(&mut self) -> Result<CpuSample, ProcessError> {
        let stat = self.stat_info()?;
        Ok(CpuSample::new(&stat.cpu_times, Instant::now()))
    }

    /// Average CPU percent since the process started.
    pub fn cpu_percent_lifetime(&mut self) -> Result<f64, ProcessError> {
        self.check(Field::CpuPercent)?;
        self.lifetime_cpu_percent().copied()
    }

    pub fn rlimit(&mut self) -> Result<Vec<RlimitStat>, ProcessError> {
        self.check(Field::Rlimit)?;
        self.limit_list().cloned()
    }

    /// Resource limits with the current usage filled in where known.
    pub fn rlimit_usage(&mut self) -> Result<Vec<RlimitStat>, ProcessError> {
        self.check(Field::RlimitUsage)?;
        self.rlimit_usage_list().cloned()
    }

    /// Controlling terminal name, empty when there is none.
    pub fn terminal(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Terminal)?;
        self.terminal_name().cloned()
    }

    /// CPU times per thread id.
    pub fn threads(&mut self) -> Result<BTreeMap<i32, CpuTimes>, ProcessError> {
        self.check(Field::Threads)?;
        self.thread_times().cloned()
    }

    /// Network counters, summed into one `all` record unless `per_nic`.
    pub fn net_io_counters(
        &mut self,
        per_nic: bool,
    ) -> Result<Vec<NetIoCountersStat>, ProcessError> {
        if per_nic {
            self.check(Field::NetIoCountersPerNic)?;
            self.net_io_nics().cloned()
        } else {
            self.check(Field::NetIoCounters)?;
            Ok(vec![self.net_io_total()?.clone()])
        }
    }

    pub fn username(&mut self) -> Result<String, ProcessError> {
        self.check(Field::Username)?;
        self.user_name().cloned()
    }

    /// TCP, UDP and unix sockets held open by the process.
    pub fn connections(&mut self) -> Result<Vec<ConnectionStat>, ProcessError> {
        self.check(Field::Connections)?;
        self.connection_list().cloned()
    }

    pub fn io_nice(&self) -> Result<i32, ProcessError> {
        self.check(Field::IoNice)?;
        Err(ProcessError::NotImplemented("io_nice"))
    }

    pub fn cpu_affinity(&self) -> Result<Vec<i32>, ProcessError> {
        Err(ProcessError::NotImplemented("cpu_affinity"))
    }
}

impl<B: ProcessBackend + Clone> Process<B> {
    /// Handle to the parent process, restricted like this one.
    pub fn parent(&mut self) -> Result<Process<B>, ProcessError> {
        let ppid = self.ppid()?;
        if ppid == 0 {
            return Err(ProcessError::NoParent(self.pid));
        }
        self.related(ppid)
    }

    /// Handles to the direct children, restricted like this one.
    pub fn children(&self) -> Result<Vec<Process<B>>, ProcessError> {
        let mut children = Vec::new();

        for pid in self.backend.pids()? {
            if pid == self.pid {
                continue;
            }
            let ppid = match self.backend.stat(pid) {
                Ok(stat) => stat.ppid,
                Err(e) if e.is_process_gone() || e.is_permission_denied() => continue,
                Err(e) => return Err(e),
            };
            if ppid != self.pid {
                continue;
            }
            match self.related(pid) {
                Ok(child) => children.push(child),
                Err(e) if e.is_process_gone() => continue,
                Err(e) => return Err(e),
            }
        }

        if children.is_empty() {
            return Err(ProcessError::NoChildren);
        }
        children.sort_by_key(|child| child.pid);
        Ok(children)
    }

    fn related(&self, pid: i32) -> Result<Process<B>, ProcessError> {
        let fields: Option<Vec<Field>> = self
            .requested
            .as_ref()
            .map(|requested| requested.iter().copied().collect());
        Process::build(
            pid,
            self.backend.clone(),
            fields.as_deref(),
            self.machine_memory,
        )
    }
}

/// Replaces a truncated name with the basename of argv[0] when that
/// basename starts with it, or with argv[0] otherwise.
fn widen_name(short: &str, args: &[String]) -> Option<String> {
    let argv0 = args.first()?;
    let base = Path::new(argv0)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(argv0);
    if base.starts_with(short) {
        Some(base.to_string())
    } else {
        Some(argv0.clone())
    }
}

fn with_usage(
    mut limits: Vec<RlimitStat>,
    stat: &StatInfo,
    status: &StatusInfo,
    num_fds: u64,
) -> Vec<RlimitStat> {
    for limit in &mut limits {
        limit.used = match limit.resource {
            RLIMIT_CPU => stat.cpu_times.total() as u64,
            RLIMIT_DATA => status.memory.data,
            RLIMIT_STACK => status.memory.stack,
            RLIMIT_RSS => status.memory.rss,
            RLIMIT_NOFILE => num_fds,
            RLIMIT_MEMLOCK => status.memory.locked,
            RLIMIT_AS => status.memory.vms,
            RLIMIT_SIGPENDING => u64::from(status.signals.pending_process.count_ones()),
            // RLIMIT_NICE counts as 20 - nice
            RLIMIT_NICE => (20 - stat.nice).max(0) as u64,
            RLIMIT_RTPRIO => stat.rt_priority.max(0) as u64,
            _ => 0,
        };
    }
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::mock::scenarios;
    use crate::collector::procfs::{ProcfsBackend, ProcfsConfig};

    fn backend(fs: &MockFs) -> ProcfsBackend<MockFs> {
        ProcfsBackend::new(fs.clone(), ProcfsConfig::default().with_num_cpus(4))
    }

    #[test]
    fn test_new_unknown_pid() {
        let fs = MockFs::typical_system();
        let result = Process::new(4242, backend(&fs));
        assert!(matches!(result, Err(ProcessError::NotRunning(4242))));
    }

    #[test]
    fn test_create_time_is_stable() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        // btime 1700000000 s + starttime 100000 ticks at 100 Hz
        assert_eq!(process.create_time().unwrap(), 1_700_001_000_000);

        let mut bash = scenarios::bash();
        bash.starttime += 500;
        fs.add_file("/proc/1000/stat", bash.stat_line());
        let _ = process.times().unwrap();
        assert_eq!(process.create_time().unwrap(), 1_700_001_000_000);
    }

    #[test]
    fn test_unrestricted_rereads() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert_eq!(process.times().unwrap().user, 1.0);

        let mut bash = scenarios::bash();
        bash.utime += 100;
        fs.add_file("/proc/1000/stat", bash.stat_line());
        assert_eq!(process.times().unwrap().user, 2.0);
    }

    #[test]
    fn test_restricted_rejects_other_fields() {
        let fs = MockFs::typical_system();
        let mut process =
            Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::Cmdline]).unwrap();

        assert!(process.is_restricted());
        assert!(matches!(
            process.memory_info(),
            Err(ProcessError::FieldNotRequested(Field::MemoryInfo))
        ));
        assert!(matches!(
            process.create_time(),
            Err(ProcessError::FieldNotRequested(Field::CreateTime))
        ));
        assert_eq!(process.cmdline().unwrap(), "/bin/bash --login");
    }

    #[test]
    fn test_restricted_reads_do_no_io() {
        let fs = MockFs::typical_system();
        let fields = [
            Field::Name,
            Field::Cmdline,
            Field::CreateTime,
            Field::MemoryInfo,
            Field::MemoryPercent,
            Field::Terminal,
            Field::RlimitUsage,
            Field::OpenFiles,
            Field::Threads,
            Field::Username,
            Field::CpuPercent,
            Field::NetIoCounters,
            Field::MemoryMapsGrouped,
            Field::IsRunning,
        ];
        let mut process = Process::with_fields(scenarios::BASH_PID, backend(&fs), &fields).unwrap();

        let before = fs.read_count();
        assert_eq!(process.name().unwrap(), "bash");
        assert_eq!(process.cmdline().unwrap(), "/bin/bash --login");
        assert_eq!(process.create_time().unwrap(), 1_700_001_000_000);
        assert_eq!(process.memory_info().unwrap().rss, 1500 * 4096);
        assert!(process.memory_percent().unwrap() > 0.0);
        assert_eq!(process.terminal().unwrap(), "pts/0");
        assert!(!process.rlimit_usage().unwrap().is_empty());
        assert_eq!(process.open_files().unwrap().len(), 4);
        assert_eq!(process.threads().unwrap().len(), 1);
        assert_eq!(process.username().unwrap(), "user");
        assert!(process.cpu_percent_lifetime().unwrap() >= 0.0);
        assert_eq!(process.net_io_counters(false).unwrap()[0].name, "all");
        assert_eq!(process.memory_maps(true).unwrap().len(), 1);
        assert!(process.is_running().unwrap());
        assert_eq!(fs.read_count(), before);
    }

    #[test]
    fn test_restricted_values_are_frozen() {
        let fs = MockFs::typical_system();
        let mut process =
            Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::Times]).unwrap();

        let mut bash = scenarios::bash();
        bash.utime += 100;
        fs.add_file("/proc/1000/stat", bash.stat_line());
        assert_eq!(process.times().unwrap().user, 1.0);
    }

    #[test]
    fn test_prefetch_failure_aborts_construction() {
        let fs = MockFs::typical_system();
        fs.remove("/proc/1000/io");

        let result = Process::with_fields(
            scenarios::BASH_PID,
            backend(&fs),
            &[Field::Name, Field::IoCounters],
        );
        match result {
            Err(e) => assert!(e.is_process_gone(), "unexpected error: {}", e),
            Ok(_) => panic!("construction should fail"),
        }

        fs.add_file("/proc/1000/io", "syscr: 1\n");
        fs.deny("/proc/1000/io");
        let result = Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::IoCounters]);
        assert!(matches!(result, Err(ProcessError::PermissionDenied { .. })));
    }

    #[test]
    fn test_unimplemented_field_can_be_requested() {
        let fs = MockFs::typical_system();
        let process =
            Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::IoNice]).unwrap();
        assert!(matches!(
            process.io_nice(),
            Err(ProcessError::NotImplemented("io_nice"))
        ));
    }

    #[test]
    fn test_connections_prefetched() {
        let fs = MockFs::typical_system();
        let mut process =
            Process::with_fields(scenarios::DAEMON_PID, backend(&fs), &[Field::Connections])
                .unwrap();

        let before = fs.read_count();
        let connections = process.connections().unwrap();
        assert_eq!(fs.read_count(), before);

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].fd, 4);
        assert_eq!(connections[0].laddr.port, 8080);
        assert_eq!(connections[0].status, "LISTEN");
        assert!(matches!(
            process.open_files(),
            Err(ProcessError::FieldNotRequested(Field::OpenFiles))
        ));
    }

    #[test]
    fn test_connections_unrestricted_rereads() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::DAEMON_PID, backend(&fs)).unwrap();
        assert_eq!(process.connections().unwrap().len(), 1);

        fs.remove("/proc/1001/fd/4");
        assert!(process.connections().unwrap().is_empty());
    }

    #[test]
    fn test_name_widened_from_cmdline() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::DAEMON_PID, backend(&fs)).unwrap();
        assert_eq!(process.name().unwrap(), "long-process-name-daemon");

        let mut short = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert_eq!(short.name().unwrap(), "bash");
    }

    #[test]
    fn test_widen_name_falls_back_to_argv0() {
        let args = vec!["/opt/run/other".to_string()];
        assert_eq!(
            widen_name("long-process-na", &args),
            Some("/opt/run/other".to_string())
        );
        assert_eq!(widen_name("long-process-na", &[]), None);
    }

    #[test]
    fn test_cpu_percent_non_blocking() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        assert_eq!(process.cpu_percent(Duration::ZERO).unwrap(), 0.0);

        let mut bash = scenarios::bash();
        bash.utime += 5;
        fs.add_file("/proc/1000/stat", bash.stat_line());
        std::thread::sleep(Duration::from_millis(60));

        let percent = process.cpu_percent(Duration::ZERO).unwrap();
        assert!(percent > 0.0, "percent = {}", percent);
        assert!(percent <= 100.0 * 4.0, "percent = {}", percent);
    }

    #[test]
    fn test_cpu_percent_blocking_idle_process() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert_eq!(process.cpu_percent(Duration::from_millis(20)).unwrap(), 0.0);
    }

    #[test]
    fn test_cpu_percent_requires_unrestricted_handle() {
        let fs = MockFs::typical_system();
        let mut process =
            Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::CpuPercent]).unwrap();
        assert!(matches!(
            process.cpu_percent(Duration::ZERO),
            Err(ProcessError::RequiresUpdate)
        ));
        assert!(process.cpu_percent_lifetime().unwrap() > 0.0);
    }

    #[test]
    fn test_memory() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        let ex = process.memory_info_ex().unwrap();
        assert_eq!(ex.rss, 1500 * 4096);
        assert_eq!(ex.vms, 6000 * 4096);
        assert_eq!(ex.shared, 700 * 4096);
        assert_eq!(ex.data, 900 * 4096);

        let info = process.memory_info().unwrap();
        assert_eq!(info.rss, 1500 * 4096);
        assert_eq!(info.hwm, 9000 * 1024);
        assert_eq!(info.stack, 136 * 1024);

        // 16384000 kB of machine memory
        let expected = (100.0 * (1500.0 * 4096.0) / (16_384_000.0 * 1024.0)) as f32;
        assert!((process.memory_percent().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_memory_percent_with_machine_memory() {
        let fs = MockFs::typical_system();
        let mut process = Process::with_machine_memory(
            scenarios::BASH_PID,
            backend(&fs),
            &[Field::MemoryPercent],
            1500 * 4096 * 4,
        )
        .unwrap();
        assert!((process.memory_percent().unwrap() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_terminal_and_process_group() {
        let fs = MockFs::typical_system();
        let mut bash = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert_eq!(bash.terminal().unwrap(), "pts/0");
        assert!(bash.foreground().unwrap());
        assert!(!bash.background().unwrap());

        let mut daemon = Process::new(scenarios::DAEMON_PID, backend(&fs)).unwrap();
        assert!(daemon.background().unwrap());

        let mut init = Process::new(scenarios::INIT_PID, backend(&fs)).unwrap();
        assert_eq!(init.terminal().unwrap(), "");
    }

    #[test]
    fn test_open_files_skip_unreadable_links() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        assert_eq!(process.num_fds().unwrap(), 5);
        let files = process.open_files().unwrap();
        let fds: Vec<u64> = files.iter().map(|f| f.fd).collect();
        assert_eq!(fds, vec![0, 1, 2, 255]);
        assert!(files.iter().all(|f| f.path == "/dev/pts/0"));
    }

    #[test]
    fn test_rlimit_usage() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        let limits = process.rlimit().unwrap();
        let nofile = limits.iter().find(|l| l.resource == RLIMIT_NOFILE).unwrap();
        assert_eq!(nofile.soft, 1024);
        assert_eq!(nofile.used, 0);

        let usage = process.rlimit_usage().unwrap();
        let nofile = usage.iter().find(|l| l.resource == RLIMIT_NOFILE).unwrap();
        assert_eq!(nofile.used, 5);
        let cpu = usage.iter().find(|l| l.resource == RLIMIT_CPU).unwrap();
        assert_eq!(cpu.used, 1);
        let stack = usage.iter().find(|l| l.resource == RLIMIT_STACK).unwrap();
        assert_eq!(stack.used, 136 * 1024);
    }

    #[test]
    fn test_status_fields() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        assert_eq!(process.status().unwrap(), "S");
        assert_eq!(process.ppid().unwrap(), 1);
        assert_eq!(process.tgid().unwrap(), 1000);
        assert_eq!(process.uids().unwrap(), vec![1000, 1000, 1000, 1000]);
        assert_eq!(process.gids().unwrap(), vec![1000, 1000, 1000, 1000]);
        assert_eq!(process.num_threads().unwrap(), 1);
        assert_eq!(process.num_ctx_switches().unwrap().voluntary, 500);
        assert_eq!(process.nice().unwrap(), 0);
        assert_eq!(process.username().unwrap(), "user");
        assert_eq!(process.cwd().unwrap(), "/home/user");
        assert_eq!(process.exe().unwrap(), "/usr/bin/bash");
        assert_eq!(process.page_faults().unwrap().minor_faults, 5000);
        assert_eq!(process.io_counters().unwrap().read_count, 5000);
    }

    #[test]
    fn test_threads() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::DAEMON_PID, backend(&fs)).unwrap();

        let threads = process.threads().unwrap();
        assert_eq!(threads.keys().copied().collect::<Vec<_>>(), vec![1001, 1003]);
    }

    #[test]
    fn test_net_io_counters() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        let per_nic = process.net_io_counters(true).unwrap();
        assert_eq!(per_nic.len(), 2);

        let all = process.net_io_counters(false).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].bytes_recv,
            per_nic.iter().map(|n| n.bytes_recv).sum::<u64>()
        );
    }

    #[test]
    fn test_parent_and_children() {
        let fs = MockFs::typical_system();
        let backend = backend(&fs);

        let init = Process::new(scenarios::INIT_PID, &backend).unwrap();
        let children = init.children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].pid(), scenarios::BASH_PID);

        let daemon = Process::new(scenarios::DAEMON_PID, &backend).unwrap();
        assert!(matches!(daemon.children(), Err(ProcessError::NoChildren)));

        let mut bash =
            Process::with_fields(scenarios::BASH_PID, &backend, &[Field::Ppid, Field::Name])
                .unwrap();
        let mut parent = bash.parent().unwrap();
        assert_eq!(parent.pid(), scenarios::INIT_PID);
        assert!(parent.is_restricted());
        assert_eq!(parent.name().unwrap(), "systemd");

        let mut init = Process::new(scenarios::INIT_PID, &backend).unwrap();
        assert!(matches!(init.parent(), Err(ProcessError::NoParent(1))));
    }

    #[test]
    fn test_is_running_after_exit() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert!(process.is_running().unwrap());

        fs.remove("/proc/1000");
        assert!(!process.is_running().unwrap());
        assert!(process.times().unwrap_err().is_process_gone());
    }

    #[test]
    fn test_is_running_detects_pid_reuse() {
        let fs = MockFs::typical_system();
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        let mut reused = scenarios::bash();
        reused.starttime += 1000;
        fs.add_file("/proc/1000/stat", reused.stat_line());
        assert!(!process.is_running().unwrap());
    }

    #[test]
    fn test_cpu_affinity_not_implemented() {
        let fs = MockFs::typical_system();
        let process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();
        assert!(matches!(
            process.cpu_affinity(),
            Err(ProcessError::NotImplemented("cpu_affinity"))
        ));
    }
}
