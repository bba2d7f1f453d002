//! Records returned by [`Process`](crate::process::Process) accessors.
//!
//! All records serialize with camelCase keys so JSON output matches the
//! shape other process tooling already consumes.

use serde::{Deserialize, Serialize};

/// Cumulative CPU time of a process or thread, in seconds.
///
/// Source: `/proc/[pid]/stat` fields 14, 15 and 42.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuTimes {
    pub cpu: String,
    pub user: f64,
    pub system: f64,
    /// Block IO delay (`delayacct_blkio_ticks`).
    pub iowait: f64,
}

impl CpuTimes {
    /// User plus system time.
    pub fn total(&self) -> f64 {
        self.user + self.system
    }
}

/// Memory usage in bytes.
///
/// Source: `/proc/[pid]/statm` (rss, vms) and `/proc/[pid]/status` (the rest).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfoStat {
    pub rss: u64,
    pub vms: u64,
    pub hwm: u64,
    pub data: u64,
    pub stack: u64,
    pub locked: u64,
    pub swap: u64,
}

/// Extended memory usage in bytes.
///
/// Source: `/proc/[pid]/statm`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfoExStat {
    pub rss: u64,
    pub vms: u64,
    pub shared: u64,
    pub text: u64,
    pub lib: u64,
    pub data: u64,
    pub dirty: u64,
}

/// Source: `/proc/[pid]/io`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoCountersStat {
    /// Read syscalls (`syscr`).
    pub read_count: u64,
    /// Write syscalls (`syscw`).
    pub write_count: u64,
    /// Bytes fetched from the storage layer.
    pub read_bytes: u64,
    /// Bytes sent to the storage layer.
    pub write_bytes: u64,
    /// Bytes passed to read-like syscalls (`rchar`).
    pub read_chars: u64,
    /// Bytes passed to write-like syscalls (`wchar`).
    pub write_chars: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumCtxSwitchesStat {
    pub voluntary: i64,
    pub involuntary: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFaultsStat {
    pub minor_faults: u64,
    pub major_faults: u64,
    pub child_minor_faults: u64,
    pub child_major_faults: u64,
}

/// Signal masks from `/proc/[pid]/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInfoStat {
    /// `ShdPnd`
    pub pending_process: u64,
    /// `SigPnd`
    pub pending_thread: u64,
    pub blocked: u64,
    pub ignored: u64,
    pub caught: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFilesStat {
    pub path: String,
    pub fd: u64,
}

/// Socket address. `ip` holds the path for unix sockets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addr {
    pub ip: String,
    pub port: u32,
}

/// A socket held open by the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStat {
    pub fd: u32,
    pub family: u32,
    #[serde(rename = "type")]
    pub socket_type: u32,
    pub laddr: Addr,
    pub raddr: Addr,
    pub status: String,
    pub pid: i32,
}

pub const AF_UNIX: u32 = 1;
pub const AF_INET: u32 = 2;
pub const AF_INET6: u32 = 10;

pub const SOCK_STREAM: u32 = 1;
pub const SOCK_DGRAM: u32 = 2;

/// One resource limit. `used` is only filled by `rlimit_usage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlimitStat {
    pub resource: i32,
    pub soft: i64,
    pub hard: i64,
    pub used: u64,
}

pub const RLIMIT_CPU: i32 = 0;
pub const RLIMIT_FSIZE: i32 = 1;
pub const RLIMIT_DATA: i32 = 2;
pub const RLIMIT_STACK: i32 = 3;
pub const RLIMIT_CORE: i32 = 4;
pub const RLIMIT_RSS: i32 = 5;
pub const RLIMIT_NPROC: i32 = 6;
pub const RLIMIT_NOFILE: i32 = 7;
pub const RLIMIT_MEMLOCK: i32 = 8;
pub const RLIMIT_AS: i32 = 9;
pub const RLIMIT_LOCKS: i32 = 10;
pub const RLIMIT_SIGPENDING: i32 = 11;
pub const RLIMIT_MSGQUEUE: i32 = 12;
pub const RLIMIT_NICE: i32 = 13;
pub const RLIMIT_RTPRIO: i32 = 14;
pub const RLIMIT_RTTIME: i32 = 15;

/// One mapping of `/proc/[pid]/smaps`. Sizes are in kB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMapsStat {
    pub path: String,
    pub rss: u64,
    pub size: u64,
    pub pss: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub private_clean: u64,
    pub private_dirty: u64,
    pub referenced: u64,
    pub anonymous: u64,
    pub swap: u64,
}

impl MemoryMapsStat {
    /// Sums all mappings into a single record with an empty path.
    pub fn grouped(maps: &[MemoryMapsStat]) -> MemoryMapsStat {
        maps.iter().fold(MemoryMapsStat::default(), |mut acc, m| {
            acc.rss += m.rss;
            acc.size += m.size;
            acc.pss += m.pss;
            acc.shared_clean += m.shared_clean;
            acc.shared_dirty += m.shared_dirty;
            acc.private_clean += m.private_clean;
            acc.private_dirty += m.private_dirty;
            acc.referenced += m.referenced;
            acc.anonymous += m.anonymous;
            acc.swap += m.swap;
            acc
        })
    }
}

/// Network counters as seen from the process' network namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetIoCountersStat {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
    pub fifoin: u64,
    pub fifoout: u64,
}

impl NetIoCountersStat {
    /// Sums per-interface counters into one record named `all`.
    pub fn aggregate(per_nic: &[NetIoCountersStat]) -> NetIoCountersStat {
        let init = NetIoCountersStat {
            name: "all".to_string(),
            ..Default::default()
        };
        per_nic.iter().fold(init, |mut acc, nic| {
            acc.bytes_sent += nic.bytes_sent;
            acc.bytes_recv += nic.bytes_recv;
            acc.packets_sent += nic.packets_sent;
            acc.packets_recv += nic.packets_recv;
            acc.errin += nic.errin;
            acc.errout += nic.errout;
            acc.dropin += nic.dropin;
            acc.dropout += nic.dropout;
            acc.fifoin += nic.fifoin;
            acc.fifoout += nic.fifoout;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_memory_maps() {
        let maps = vec![
            MemoryMapsStat {
                path: "/bin/cat".to_string(),
                rss: 40,
                size: 44,
                ..Default::default()
            },
            MemoryMapsStat {
                path: "[stack]".to_string(),
                rss: 12,
                size: 132,
                swap: 4,
                ..Default::default()
            },
        ];

        let grouped = MemoryMapsStat::grouped(&maps);
        assert_eq!(grouped.path, "");
        assert_eq!(grouped.rss, 52);
        assert_eq!(grouped.size, 176);
        assert_eq!(grouped.swap, 4);
    }

    #[test]
    fn test_aggregate_net_io() {
        let nics = vec![
            NetIoCountersStat {
                name: "lo".to_string(),
                bytes_recv: 10,
                bytes_sent: 10,
                ..Default::default()
            },
            NetIoCountersStat {
                name: "eth0".to_string(),
                bytes_recv: 5,
                errin: 1,
                ..Default::default()
            },
        ];

        let all = NetIoCountersStat::aggregate(&nics);
        assert_eq!(all.name, "all");
        assert_eq!(all.bytes_recv, 15);
        assert_eq!(all.bytes_sent, 10);
        assert_eq!(all.errin, 1);
    }

    #[test]
    fn test_records_serialize_camel_case() {
        let faults = PageFaultsStat {
            minor_faults: 1,
            child_major_faults: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&faults).unwrap();
        assert_eq!(json["minorFaults"], 1);
        assert_eq!(json["childMajorFaults"], 2);

        let io = IoCountersStat {
            read_count: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&io).unwrap();
        assert_eq!(json["readCount"], 3);
    }
}
