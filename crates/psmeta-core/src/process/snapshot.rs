//! Serializable view of everything a handle can report.

use crate::process::backend::ProcessBackend;
use crate::process::error::ProcessError;
use crate::process::field::Field;
use crate::process::handle::Process;
use crate::process::types::{
    ConnectionStat, CpuTimes, IoCountersStat, MemoryInfoExStat, MemoryInfoStat, MemoryMapsStat,
    NetIoCountersStat, NumCtxSwitchesStat, OpenFilesStat, PageFaultsStat, RlimitStat,
};
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One process, one optional value per field.
///
/// Fields that were not requested, or could not be read, are `None` and
/// left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    pub pid: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline_slice: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,
    /// Create time as RFC 3339 UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tgid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uids: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gids: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nice: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_fds: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx_switches: Option<NumCtxSwitchesStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<CpuTimes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<BTreeMap<i32, CpuTimes>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_faults: Option<PageFaultsStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_info: Option<MemoryInfoStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_info_ex: Option<MemoryInfoExStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_maps: Option<Vec<MemoryMapsStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_maps_grouped: Option<MemoryMapsStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_counters: Option<IoCountersStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_files: Option<Vec<OpenFilesStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<ConnectionStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rlimit: Option<Vec<RlimitStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rlimit_usage: Option<Vec<RlimitStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_io_counters: Option<NetIoCountersStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_io_counters_per_nic: Option<Vec<NetIoCountersStat>>,
}

fn rfc3339(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl<B: ProcessBackend> Process<B> {
    /// Reads the requested fields (every field when unrestricted) into a
    /// snapshot. Fields that fail are logged and left empty.
    pub fn snapshot(&mut self) -> ProcessSnapshot {
        let fields: Vec<Field> = match self.requested_fields() {
            Some(requested) => requested.iter().copied().collect(),
            None => Field::ALL.to_vec(),
        };

        let mut snapshot = ProcessSnapshot {
            pid: self.pid(),
            ..Default::default()
        };
        for field in fields {
            if let Err(e) = self.capture(&mut snapshot, field) {
                debug!(pid = self.pid(), %field, error = %e, "field unavailable");
            }
        }
        snapshot
    }

    fn capture(&mut self, out: &mut ProcessSnapshot, field: Field) -> Result<(), ProcessError> {
        match field {
            Field::Background => out.background = Some(self.background()?),
            Field::Cmdline => out.cmdline = Some(self.cmdline()?),
            Field::CmdlineSlice => out.cmdline_slice = Some(self.cmdline_slice()?),
            Field::CpuPercent => out.cpu_percent = Some(self.cpu_percent_lifetime()?),
            Field::CreateTime => {
                let millis = self.create_time()?;
                out.create_time = Some(millis);
                out.started_at = rfc3339(millis);
            }
            Field::Cwd => out.cwd = Some(self.cwd()?),
            Field::Exe => out.exe = Some(self.exe()?),
            Field::Foreground => out.foreground = Some(self.foreground()?),
            Field::Gids => out.gids = Some(self.gids()?),
            Field::IoCounters => out.io_counters = Some(self.io_counters()?),
            Field::IsRunning => out.is_running = Some(self.is_running()?),
            Field::MemoryInfo => out.memory_info = Some(self.memory_info()?),
            Field::MemoryInfoEx => out.memory_info_ex = Some(self.memory_info_ex()?),
            Field::MemoryMaps => out.memory_maps = Some(self.memory_maps(false)?),
            Field::MemoryMapsGrouped => {
                out.memory_maps_grouped = self.memory_maps(true)?.into_iter().next();
            }
            Field::MemoryPercent => out.memory_percent = Some(self.memory_percent()?),
            Field::Name => out.name = Some(self.name()?),
            Field::NetIoCounters => {
                out.net_io_counters = self.net_io_counters(false)?.into_iter().next();
            }
            Field::NetIoCountersPerNic => {
                out.net_io_counters_per_nic = Some(self.net_io_counters(true)?);
            }
            Field::Nice => out.nice = Some(self.nice()?),
            Field::NumCtxSwitches => out.num_ctx_switches = Some(self.num_ctx_switches()?),
            Field::NumFds => out.num_fds = Some(self.num_fds()?),
            Field::NumThreads => out.num_threads = Some(self.num_threads()?),
            Field::OpenFiles => out.open_files = Some(self.open_files()?),
            Field::PageFaults => out.page_faults = Some(self.page_faults()?),
            Field::Ppid => out.ppid = Some(self.ppid()?),
            Field::Rlimit => out.rlimit = Some(self.rlimit()?),
            Field::RlimitUsage => out.rlimit_usage = Some(self.rlimit_usage()?),
            Field::Status => out.status = Some(self.status()?),
            Field::Terminal => out.terminal = Some(self.terminal()?),
            Field::Tgid => out.tgid = Some(self.tgid()?),
            Field::Threads => out.threads = Some(self.threads()?),
            Field::Times => out.times = Some(self.times()?),
            Field::Uids => out.uids = Some(self.uids()?),
            Field::Username => out.username = Some(self.username()?),
            Field::Connections => out.connections = Some(self.connections()?),
            // no value to report
            Field::IoNice => {
                self.io_nice()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, scenarios};
    use crate::collector::procfs::{ProcfsBackend, ProcfsConfig};

    fn backend(fs: &MockFs) -> ProcfsBackend<MockFs> {
        ProcfsBackend::new(fs.clone(), ProcfsConfig::default())
    }

    #[test]
    fn test_restricted_snapshot_has_only_requested_fields() {
        let fs = MockFs::typical_system();
        let mut process = Process::with_fields(
            scenarios::BASH_PID,
            backend(&fs),
            &[Field::Name, Field::CreateTime, Field::MemoryInfoEx],
        )
        .unwrap();

        let snapshot = process.snapshot();
        assert_eq!(snapshot.pid, 1000);
        assert_eq!(snapshot.name.as_deref(), Some("bash"));
        assert_eq!(snapshot.create_time, Some(1_700_001_000_000));
        assert_eq!(
            snapshot.started_at.as_deref(),
            Some("2023-11-14T22:30:00.000Z")
        );
        assert_eq!(snapshot.memory_info_ex.unwrap().rss, 1500 * 4096);
        assert!(snapshot.cmdline.is_none());
        assert!(snapshot.io_counters.is_none());
    }

    #[test]
    fn test_snapshot_json_omits_missing_fields() {
        let fs = MockFs::typical_system();
        let mut process =
            Process::with_fields(scenarios::BASH_PID, backend(&fs), &[Field::NumCtxSwitches])
                .unwrap();

        let json = serde_json::to_value(process.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pid": 1000,
                "numCtxSwitches": { "voluntary": 500, "involuntary": 50 }
            })
        );
    }

    #[test]
    fn test_unrestricted_snapshot_skips_failing_fields() {
        let fs = MockFs::typical_system();
        fs.deny("/proc/1000/io");
        let mut process = Process::new(scenarios::BASH_PID, backend(&fs)).unwrap();

        let snapshot = process.snapshot();
        assert_eq!(snapshot.name.as_deref(), Some("bash"));
        assert_eq!(snapshot.terminal.as_deref(), Some("pts/0"));
        assert_eq!(snapshot.is_running, Some(true));
        assert_eq!(snapshot.open_files.map(|f| f.len()), Some(4));
        assert!(snapshot.io_counters.is_none());
        assert_eq!(snapshot.net_io_counters.unwrap().name, "all");
        assert_eq!(snapshot.memory_maps_grouped.unwrap().rss, 1500);
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(rfc3339(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
    }
}
