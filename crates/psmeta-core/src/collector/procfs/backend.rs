//! [`ProcessBackend`] over a `/proc` tree.

use crate::collector::procfs::config::ProcfsConfig;
use crate::collector::procfs::parser::{
    GlobalStat, NetSocket, ParseError, ProcStat, UserResolver, parse_cmdline, parse_global_stat,
    parse_limits, parse_meminfo, parse_net_dev, parse_proc_io, parse_proc_net_inet,
    parse_proc_net_unix, parse_proc_stat, parse_proc_status, parse_proc_statm, parse_smaps,
    parse_socket_inode,
};
use crate::collector::traits::{FileSystem, RealFs};
use crate::process::backend::{ProcessBackend, StatInfo, StatusInfo};
use crate::process::error::ProcessError;
use crate::process::types::{
    AF_INET, AF_INET6, AF_UNIX, Addr, ConnectionStat, CpuTimes, IoCountersStat, MemoryInfoExStat, MemoryInfoStat, MemoryMapsStat,
    NetIoCountersStat, NumCtxSwitchesStat, OpenFilesStat, PageFaultsStat, RLIMIT_AS, RLIMIT_CORE,
    RLIMIT_CPU, RLIMIT_DATA, RLIMIT_FSIZE, RLIMIT_LOCKS, RLIMIT_MEMLOCK, RLIMIT_MSGQUEUE,
    RLIMIT_NICE, RLIMIT_NOFILE, RLIMIT_NPROC, RLIMIT_RSS, RLIMIT_RTPRIO, RLIMIT_RTTIME,
    RLIMIT_SIGPENDING, RLIMIT_STACK, RlimitStat, SOCK_DGRAM, SOCK_STREAM, SignalInfoStat,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Reads process attributes from `/proc/[pid]/`.
///
/// Boot time, CPU count and the passwd table are read once and shared by
/// every handle using this backend. Per-process files are read on every
/// call.
#[derive(Debug, Clone)]
pub struct ProcfsBackend<F: FileSystem> {
    fs: F,
    config: ProcfsConfig,
    global: OnceLock<GlobalStat>,
    users: OnceLock<UserResolver>,
}

impl ProcfsBackend<RealFs> {
    /// Backend for the running host.
    pub fn local() -> Self {
        Self::new(RealFs::new(), ProcfsConfig::from_env())
    }
}

impl<F: FileSystem> ProcfsBackend<F> {
    pub fn new(fs: F, config: ProcfsConfig) -> Self {
        Self {
            fs,
            config,
            global: OnceLock::new(),
            users: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ProcfsConfig {
        &self.config
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    fn proc_dir(&self, pid: i32) -> PathBuf {
        self.config.proc_path.join(pid.to_string())
    }

    fn read_string(&self, path: &Path) -> Result<String, ProcessError> {
        self.fs
            .read_to_string(path)
            .map_err(|e| ProcessError::from_io(path, e))
    }

    fn read_parsed<T>(
        &self,
        path: &Path,
        parse: impl FnOnce(&str) -> Result<T, ParseError>,
    ) -> Result<T, ProcessError> {
        let content = self.read_string(path)?;
        parse(&content).map_err(|e| ProcessError::parse(path, e))
    }

    fn read_link(&self, path: &Path) -> Result<String, ProcessError> {
        self.fs
            .read_link(path)
            .map(|target| target.to_string_lossy().into_owned())
            .map_err(|e| ProcessError::from_io(path, e))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, ProcessError> {
        let entries = self
            .fs
            .read_dir(path)
            .map_err(|e| ProcessError::from_io(path, e))?;
        Ok(entries
            .iter()
            .filter_map(|entry| entry.file_name()?.to_str().map(str::to_string))
            .collect())
    }

    /// Reads and parses a network table. Tables the kernel does not
    /// provide (no IPv6, no unix sockets) read as empty.
    fn read_socket_table(
        &self,
        path: &Path,
        parse: impl FnOnce(&str) -> Result<Vec<NetSocket>, ParseError>,
    ) -> Result<Vec<NetSocket>, ProcessError> {
        match self.fs.read_to_string(path) {
            Ok(content) => parse(&content).map_err(|e| ProcessError::parse(path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "socket table not present");
                Ok(Vec::new())
            }
            Err(e) => Err(ProcessError::from_io(path, e)),
        }
    }

    fn global(&self) -> Result<&GlobalStat, ProcessError> {
        if let Some(global) = self.global.get() {
            return Ok(global);
        }
        let path = self.config.proc_path.join("stat");
        let global = self.read_parsed(&path, parse_global_stat)?;
        debug!(
            btime = global.btime,
            cpus = global.cpu_count,
            "read system boot time"
        );
        Ok(self.global.get_or_init(|| global))
    }

    fn users(&self) -> Result<&UserResolver, ProcessError> {
        if let Some(users) = self.users.get() {
            return Ok(users);
        }
        let path = self.config.etc_path.join("passwd");
        let content = self.read_string(&path)?;
        Ok(self.users.get_or_init(|| UserResolver::from_passwd(&content)))
    }

    fn read_stat(&self, path: &Path) -> Result<StatInfo, ProcessError> {
        let stat = self.read_parsed(path, parse_proc_stat)?;
        let btime = self.global()?.btime;
        Ok(self.stat_info(stat, btime))
    }

    fn stat_info(&self, stat: ProcStat, btime: u64) -> StatInfo {
        let ticks = self.config.clock_ticks.max(1);
        let secs = |value: u64| value as f64 / ticks as f64;

        let nice = if self.config.live_priority {
            live_nice(stat.pid).unwrap_or(stat.nice)
        } else {
            stat.nice
        };
        // Negative priorities are real-time: -2 is rt priority 1 and so on.
        let rt_priority = if stat.priority < 0 {
            (-stat.priority - 1) as i32
        } else {
            0
        };

        StatInfo {
            state: stat.state.to_string(),
            ppid: stat.ppid,
            pgid: stat.pgrp,
            tpgid: stat.tpgid,
            terminal: u64::try_from(stat.tty_nr).unwrap_or(0),
            cpu_times: CpuTimes {
                cpu: "cpu".to_string(),
                user: secs(stat.utime),
                system: secs(stat.stime),
                iowait: secs(stat.delayacct_blkio_ticks),
            },
            create_time: (btime * 1000 + stat.starttime * 1000 / ticks) as i64,
            nice,
            rt_priority,
            num_threads: stat.num_threads,
            page_faults: PageFaultsStat {
                minor_faults: stat.minflt,
                major_faults: stat.majflt,
                child_minor_faults: stat.cminflt,
                child_major_faults: stat.cmajflt,
            },
            name: stat.comm,
        }
    }
}

#[cfg(target_os = "linux")]
fn live_nice(pid: i32) -> Option<i32> {
    let who = libc::id_t::try_from(pid).ok()?;
    // SAFETY: errno is thread-local and getpriority takes no pointers.
    unsafe {
        *libc::__errno_location() = 0;
        let nice = libc::getpriority(libc::PRIO_PROCESS, who);
        // -1 is a valid nice value, errno tells it apart from a failure
        if nice == -1 && *libc::__errno_location() != 0 {
            return None;
        }
        Some(nice)
    }
}

#[cfg(not(target_os = "linux"))]
fn live_nice(_pid: i32) -> Option<i32> {
    None
}

fn resource_id(name: &str) -> Option<i32> {
    let id = match name {
        "Max cpu time" => RLIMIT_CPU,
        "Max file size" => RLIMIT_FSIZE,
        "Max data size" => RLIMIT_DATA,
        "Max stack size" => RLIMIT_STACK,
        "Max core file size" => RLIMIT_CORE,
        "Max resident set" => RLIMIT_RSS,
        "Max processes" => RLIMIT_NPROC,
        "Max open files" => RLIMIT_NOFILE,
        "Max locked memory" => RLIMIT_MEMLOCK,
        "Max address space" => RLIMIT_AS,
        "Max file locks" => RLIMIT_LOCKS,
        "Max pending signals" => RLIMIT_SIGPENDING,
        "Max msgqueue size" => RLIMIT_MSGQUEUE,
        "Max nice priority" => RLIMIT_NICE,
        "Max realtime priority" => RLIMIT_RTPRIO,
        "Max realtime timeout" => RLIMIT_RTTIME,
        _ => return None,
    };
    Some(id)
}

impl<F: FileSystem> ProcessBackend for ProcfsBackend<F> {
    fn pids(&self) -> Result<Vec<i32>, ProcessError> {
        let entries = self.list_dir(&self.config.proc_path)?;
        Ok(entries
            .iter()
            .filter_map(|name| name.parse::<i32>().ok())
            .collect())
    }

    fn pid_exists(&self, pid: i32) -> Result<bool, ProcessError> {
        if pid <= 0 {
            return Ok(false);
        }
        Ok(self.fs.exists(&self.proc_dir(pid)))
    }

    fn stat(&self, pid: i32) -> Result<StatInfo, ProcessError> {
        self.read_stat(&self.proc_dir(pid).join("stat"))
    }

    fn status(&self, pid: i32) -> Result<StatusInfo, ProcessError> {
        let path = self.proc_dir(pid).join("status");
        let status = self.read_parsed(&path, parse_proc_status)?;

        Ok(StatusInfo {
            name: status.name,
            state: status.state,
            ppid: status.ppid,
            tgid: status.tgid,
            uids: status.uids,
            gids: status.gids,
            num_threads: status.threads,
            ctx_switches: NumCtxSwitchesStat {
                voluntary: status.voluntary_ctxt_switches,
                involuntary: status.nonvoluntary_ctxt_switches,
            },
            memory: MemoryInfoStat {
                rss: status.vm_rss,
                vms: status.vm_size,
                hwm: status.vm_hwm,
                data: status.vm_data,
                stack: status.vm_stk,
                locked: status.vm_lck,
                swap: status.vm_swap,
            },
            signals: SignalInfoStat {
                pending_process: status.shd_pnd,
                pending_thread: status.sig_pnd,
                blocked: status.sig_blk,
                ignored: status.sig_ign,
                caught: status.sig_cgt,
            },
        })
    }

    fn statm(&self, pid: i32) -> Result<MemoryInfoExStat, ProcessError> {
        let path = self.proc_dir(pid).join("statm");
        let statm = self.read_parsed(&path, parse_proc_statm)?;
        let page = self.config.page_size;

        Ok(MemoryInfoExStat {
            rss: statm.resident * page,
            vms: statm.size * page,
            shared: statm.shared * page,
            text: statm.text * page,
            lib: statm.lib * page,
            data: statm.data * page,
            dirty: statm.dirty * page,
        })
    }

    fn io_counters(&self, pid: i32) -> Result<IoCountersStat, ProcessError> {
        let path = self.proc_dir(pid).join("io");
        let io = self.read_parsed(&path, parse_proc_io)?;

        Ok(IoCountersStat {
            read_count: io.syscr,
            write_count: io.syscw,
            read_bytes: io.read_bytes,
            write_bytes: io.write_bytes,
            read_chars: io.rchar,
            write_chars: io.wchar,
        })
    }

    fn cmdline(&self, pid: i32) -> Result<Vec<String>, ProcessError> {
        let path = self.proc_dir(pid).join("cmdline");
        let content = self
            .fs
            .read(&path)
            .map_err(|e| ProcessError::from_io(&path, e))?;
        Ok(parse_cmdline(&content))
    }

    fn cwd(&self, pid: i32) -> Result<String, ProcessError> {
        self.read_link(&self.proc_dir(pid).join("cwd"))
    }

    fn exe(&self, pid: i32) -> Result<String, ProcessError> {
        self.read_link(&self.proc_dir(pid).join("exe"))
    }

    fn fd_list(&self, pid: i32) -> Result<Vec<String>, ProcessError> {
        let mut fds = self.list_dir(&self.proc_dir(pid).join("fd"))?;
        fds.sort_by_key(|fd| fd.parse::<u64>().unwrap_or(u64::MAX));
        Ok(fds)
    }

    fn open_files(&self, pid: i32, fds: &[String]) -> Result<Vec<OpenFilesStat>, ProcessError> {
        let dir = self.proc_dir(pid).join("fd");
        let mut files = Vec::with_capacity(fds.len());

        for name in fds {
            let link = dir.join(name);
            let fd = name.parse::<u64>().map_err(|_| {
                ProcessError::parse(&link, ParseError::new("descriptor name is not a number"))
            })?;
            let path = match self.fs.read_link(&link) {
                Ok(target) => target.to_string_lossy().into_owned(),
                Err(e) => {
                    trace!(pid, fd, error = %e, "skipping unreadable descriptor");
                    continue;
                }
            };
            files.push(OpenFilesStat { path, fd });
        }

        Ok(files)
    }

    fn connections(&self, pid: i32, fds: &[String]) -> Result<Vec<ConnectionStat>, ProcessError> {
        let dir = self.proc_dir(pid).join("fd");
        let mut socket_fds = HashMap::new();

        for name in fds {
            let link = dir.join(name);
            let fd = name.parse::<u32>().map_err(|_| {
                ProcessError::parse(&link, ParseError::new("descriptor name is not a number"))
            })?;
            let Ok(target) = self.fs.read_link(&link) else {
                continue;
            };
            if let Some(inode) = parse_socket_inode(&target.to_string_lossy()) {
                socket_fds.insert(inode, fd);
            }
        }
        if socket_fds.is_empty() {
            return Ok(Vec::new());
        }

        let net = self.proc_dir(pid).join("net");
        let tables: [(&str, u32, Option<u32>); 5] = [
            ("tcp", AF_INET, Some(SOCK_STREAM)),
            ("tcp6", AF_INET6, Some(SOCK_STREAM)),
            ("udp", AF_INET, Some(SOCK_DGRAM)),
            ("udp6", AF_INET6, Some(SOCK_DGRAM)),
            ("unix", AF_UNIX, None),
        ];

        let mut connections = Vec::new();
        for (table, family, inet_type) in tables {
            let path = net.join(table);
            let sockets = match inet_type {
                Some(kind) => self.read_socket_table(&path, |content| {
                    parse_proc_net_inet(content, kind == SOCK_STREAM)
                })?,
                None => self.read_socket_table(&path, parse_proc_net_unix)?,
            };

            for socket in sockets {
                let Some(&fd) = socket_fds.get(&socket.inode) else {
                    continue;
                };
                connections.push(ConnectionStat {
                    fd,
                    family,
                    socket_type: inet_type.unwrap_or(socket.socket_type),
                    laddr: Addr {
                        ip: socket.local_ip,
                        port: socket.local_port,
                    },
                    raddr: Addr {
                        ip: socket.remote_ip,
                        port: socket.remote_port,
                    },
                    status: socket.status,
                    pid,
                });
            }
        }

        connections.sort_by_key(|c| c.fd);
        Ok(connections)
    }

    fn thread_ids(&self, pid: i32) -> Result<Vec<i32>, ProcessError> {
        let entries = self.list_dir(&self.proc_dir(pid).join("task"))?;
        let mut tids: Vec<i32> = entries.iter().filter_map(|t| t.parse().ok()).collect();
        tids.sort_unstable();
        Ok(tids)
    }

    fn thread_stat(&self, pid: i32, tid: i32) -> Result<StatInfo, ProcessError> {
        let path = self
            .proc_dir(pid)
            .join("task")
            .join(tid.to_string())
            .join("stat");
        self.read_stat(&path)
    }

    fn memory_maps(&self, pid: i32) -> Result<Vec<MemoryMapsStat>, ProcessError> {
        let path = self.proc_dir(pid).join("smaps");
        let regions = self.read_parsed(&path, parse_smaps)?;

        Ok(regions
            .into_iter()
            .map(|region| MemoryMapsStat {
                path: region.path,
                rss: region.rss,
                size: region.size,
                pss: region.pss,
                shared_clean: region.shared_clean,
                shared_dirty: region.shared_dirty,
                private_clean: region.private_clean,
                private_dirty: region.private_dirty,
                referenced: region.referenced,
                anonymous: region.anonymous,
                swap: region.swap,
            })
            .collect())
    }

    fn limits(&self, pid: i32) -> Result<Vec<RlimitStat>, ProcessError> {
        let path = self.proc_dir(pid).join("limits");
        let entries = self.read_parsed(&path, parse_limits)?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let Some(resource) = resource_id(&entry.name) else {
                    trace!(pid, name = %entry.name, "unknown resource limit");
                    return None;
                };
                Some(RlimitStat {
                    resource,
                    soft: entry.soft,
                    hard: entry.hard,
                    used: 0,
                })
            })
            .collect())
    }

    fn net_io_counters(&self, pid: i32) -> Result<Vec<NetIoCountersStat>, ProcessError> {
        let path = self.proc_dir(pid).join("net").join("dev");
        let devices = self.read_parsed(&path, parse_net_dev)?;

        Ok(devices
            .into_iter()
            .map(|dev| NetIoCountersStat {
                name: dev.interface,
                bytes_sent: dev.tx_bytes,
                bytes_recv: dev.rx_bytes,
                packets_sent: dev.tx_packets,
                packets_recv: dev.rx_packets,
                errin: dev.rx_errs,
                errout: dev.tx_errs,
                dropin: dev.rx_drop,
                dropout: dev.tx_drop,
                fifoin: dev.rx_fifo,
                fifoout: dev.tx_fifo,
            })
            .collect())
    }

    fn terminal_map(&self) -> Result<HashMap<u64, String>, ProcessError> {
        let dev = &self.config.dev_path;
        let mut terminals = HashMap::new();

        let mut add = |path: PathBuf, name: String| match self.fs.device_id(&path) {
            Ok(rdev) => {
                terminals.insert(rdev, name);
            }
            Err(e) => trace!(path = %path.display(), error = %e, "skipping terminal"),
        };

        for name in self.list_dir(dev)? {
            if name.starts_with("tty") {
                add(dev.join(&name), name);
            }
        }

        let pts = dev.join("pts");
        if self.fs.exists(&pts) {
            for name in self.list_dir(&pts)? {
                if name != "ptmx" {
                    add(pts.join(&name), format!("pts/{}", name));
                }
            }
        }

        Ok(terminals)
    }

    fn username(&self, uid: u32) -> Result<String, ProcessError> {
        Ok(self.users()?.resolve(uid))
    }

    fn total_memory(&self) -> Result<u64, ProcessError> {
        let path = self.config.proc_path.join("meminfo");
        let meminfo = self.read_parsed(&path, parse_meminfo)?;
        Ok(meminfo.mem_total * 1024)
    }

    fn num_cpus(&self) -> usize {
        let detected = || self.global().map(|global| global.cpu_count).unwrap_or(1);
        self.config.num_cpus.unwrap_or_else(detected).max(1)
    }
}
