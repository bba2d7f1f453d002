//! Per-handle attribute cache, one slot per resolver.

use crate::process::backend::{StatInfo, StatusInfo};
use crate::process::error::ProcessError;
use crate::process::field::Resolver;
use crate::process::types::{
    ConnectionStat, CpuTimes, IoCountersStat, MemoryInfoExStat, MemoryMapsStat, NetIoCountersStat, OpenFilesStat,
    RlimitStat,
};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub(crate) struct AttributeCache {
    pub cmdline: Option<Vec<String>>,
    pub stat: Option<StatInfo>,
    pub cwd: Option<String>,
    pub exe: Option<String>,
    pub fd_list: Option<Vec<String>>,
    pub open_files: Option<Vec<OpenFilesStat>>,
    pub connections: Option<Vec<ConnectionStat>>,
    pub io: Option<IoCountersStat>,
    pub statm: Option<MemoryInfoExStat>,
    pub status: Option<StatusInfo>,
    pub threads: Option<BTreeMap<i32, CpuTimes>>,
    pub memory_maps: Option<Vec<MemoryMapsStat>>,
    pub memory_maps_grouped: Option<MemoryMapsStat>,
    pub limits: Option<Vec<RlimitStat>>,
    pub rlimit_usage: Option<Vec<RlimitStat>>,
    pub terminal: Option<String>,
    pub net_io: Option<NetIoCountersStat>,
    pub net_io_per_nic: Option<Vec<NetIoCountersStat>>,
    pub username: Option<String>,
    pub is_running: Option<bool>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f32>,
}

impl AttributeCache {
    pub fn is_populated(&self, resolver: Resolver) -> bool {
        match resolver {
            Resolver::Cmdline => self.cmdline.is_some(),
            Resolver::Stat => self.stat.is_some(),
            Resolver::Cwd => self.cwd.is_some(),
            Resolver::Exe => self.exe.is_some(),
            Resolver::FdList => self.fd_list.is_some(),
            Resolver::OpenFiles => self.open_files.is_some(),
            Resolver::Connections => self.connections.is_some(),
            Resolver::Io => self.io.is_some(),
            Resolver::Statm => self.statm.is_some(),
            Resolver::Status => self.status.is_some(),
            Resolver::Threads => self.threads.is_some(),
            Resolver::MemoryMaps => self.memory_maps.is_some(),
            Resolver::MemoryMapsGrouped => self.memory_maps_grouped.is_some(),
            Resolver::Limits => self.limits.is_some(),
            Resolver::RlimitUsage => self.rlimit_usage.is_some(),
            Resolver::Terminal => self.terminal.is_some(),
            Resolver::NetIo => self.net_io.is_some(),
            Resolver::NetIoPerNic => self.net_io_per_nic.is_some(),
            Resolver::Username => self.username.is_some(),
            Resolver::IsRunning => self.is_running.is_some(),
            Resolver::CpuPercent => self.cpu_percent.is_some(),
            Resolver::MemoryPercent => self.memory_percent.is_some(),
        }
    }
}

/// Returns the slot's value, running `resolve` unless the slot is frozen
/// and already populated.
///
/// On failure the slot keeps its previous value.
pub(crate) fn fill<T>(
    slot: &mut Option<T>,
    frozen: bool,
    resolve: impl FnOnce() -> Result<T, ProcessError>,
) -> Result<&T, ProcessError> {
    let value = match slot.take() {
        Some(value) if frozen => value,
        previous => match resolve() {
            Ok(value) => value,
            Err(e) => {
                *slot = previous;
                return Err(e);
            }
        },
    };
    let value: &T = slot.insert(value);
    Ok(value)
}
