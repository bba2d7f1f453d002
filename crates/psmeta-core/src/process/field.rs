//! Field enumeration and the resolver keys behind each field.

use std::fmt;
use std::str::FromStr;

/// A process attribute that can be requested up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Background,
    Cmdline,
    CmdlineSlice,
    Connections,
    CpuPercent,
    CreateTime,
    Cwd,
    Exe,
    Foreground,
    Gids,
    IoCounters,
    IoNice,
    IsRunning,
    MemoryInfo,
    MemoryInfoEx,
    MemoryMaps,
    MemoryMapsGrouped,
    MemoryPercent,
    Name,
    NetIoCounters,
    NetIoCountersPerNic,
    Nice,
    NumCtxSwitches,
    NumFds,
    NumThreads,
    OpenFiles,
    PageFaults,
    Ppid,
    Rlimit,
    RlimitUsage,
    Status,
    Terminal,
    Tgid,
    Threads,
    Times,
    Uids,
    Username,
}

/// Unit of work that fills one cache slot.
///
/// Declaration order is dependency order: a resolver only depends on
/// resolvers declared before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resolver {
    Cmdline,
    Stat,
    Cwd,
    Exe,
    FdList,
    OpenFiles,
    Connections,
    Io,
    Statm,
    Status,
    Threads,
    MemoryMaps,
    MemoryMapsGrouped,
    Limits,
    RlimitUsage,
    Terminal,
    NetIo,
    NetIoPerNic,
    Username,
    IsRunning,
    CpuPercent,
    MemoryPercent,
}

impl Field {
    /// Every field, once, in declaration order.
    pub const ALL: &'static [Field] = &[
        Field::Background,
        Field::Cmdline,
        Field::CmdlineSlice,
        Field::Connections,
        Field::CpuPercent,
        Field::CreateTime,
        Field::Cwd,
        Field::Exe,
        Field::Foreground,
        Field::Gids,
        Field::IoCounters,
        Field::IoNice,
        Field::IsRunning,
        Field::MemoryInfo,
        Field::MemoryInfoEx,
        Field::MemoryMaps,
        Field::MemoryMapsGrouped,
        Field::MemoryPercent,
        Field::Name,
        Field::NetIoCounters,
        Field::NetIoCountersPerNic,
        Field::Nice,
        Field::NumCtxSwitches,
        Field::NumFds,
        Field::NumThreads,
        Field::OpenFiles,
        Field::PageFaults,
        Field::Ppid,
        Field::Rlimit,
        Field::RlimitUsage,
        Field::Status,
        Field::Terminal,
        Field::Tgid,
        Field::Threads,
        Field::Times,
        Field::Uids,
        Field::Username,
    ];

    /// Canonical label.
    pub fn label(self) -> &'static str {
        match self {
            Field::Background => "Background",
            Field::Cmdline => "Cmdline",
            Field::CmdlineSlice => "CmdlineSlice",
            Field::Connections => "Connections",
            Field::CpuPercent => "CPUPercent",
            Field::CreateTime => "CreateTime",
            Field::Cwd => "Cwd",
            Field::Exe => "Exe",
            Field::Foreground => "Foreground",
            Field::Gids => "Gids",
            Field::IoCounters => "IOCounters",
            Field::IoNice => "IOnice",
            Field::IsRunning => "IsRunning",
            Field::MemoryInfo => "MemoryInfo",
            Field::MemoryInfoEx => "MemoryInfoEx",
            Field::MemoryMaps => "MemoryMaps",
            Field::MemoryMapsGrouped => "MemoryMapsGrouped",
            Field::MemoryPercent => "MemoryPercent",
            Field::Name => "Name",
            Field::NetIoCounters => "NetIOCounters",
            Field::NetIoCountersPerNic => "NetIOCountersPerNic",
            Field::Nice => "Nice",
            Field::NumCtxSwitches => "NumCtxSwitches",
            Field::NumFds => "NumFDs",
            Field::NumThreads => "NumThreads",
            Field::OpenFiles => "OpenFiles",
            Field::PageFaults => "PageFaults",
            Field::Ppid => "Ppid",
            Field::Rlimit => "Rlimit",
            Field::RlimitUsage => "RlimitUsage",
            Field::Status => "Status",
            Field::Terminal => "Terminal",
            Field::Tgid => "Tgid",
            Field::Threads => "Threads",
            Field::Times => "Times",
            Field::Uids => "Uids",
            Field::Username => "Username",
        }
    }

    /// Resolvers that must run for this field to be readable from cache.
    ///
    /// Fields without an implementation map to nothing.
    pub fn resolvers(self) -> &'static [Resolver] {
        use Resolver as R;
        match self {
            Field::Background | Field::Foreground => &[R::Stat],
            Field::Cmdline | Field::CmdlineSlice => &[R::Cmdline],
            Field::Connections => &[R::FdList, R::Connections],
            Field::IoNice => &[],
            Field::CpuPercent => &[R::Stat, R::CpuPercent],
            Field::CreateTime => &[R::Stat],
            Field::Cwd => &[R::Cwd],
            Field::Exe => &[R::Exe],
            Field::Gids
            | Field::Uids
            | Field::Tgid
            | Field::Name
            | Field::Status
            | Field::NumThreads
            | Field::NumCtxSwitches => &[R::Status],
            Field::IoCounters => &[R::Io],
            Field::IsRunning => &[R::IsRunning],
            Field::MemoryInfo => &[R::Statm, R::Status],
            Field::MemoryInfoEx => &[R::Statm],
            Field::MemoryMaps => &[R::MemoryMaps],
            Field::MemoryMapsGrouped => &[R::MemoryMapsGrouped],
            Field::MemoryPercent => &[R::Statm, R::MemoryPercent],
            Field::NetIoCounters => &[R::NetIo],
            Field::NetIoCountersPerNic => &[R::NetIoPerNic],
            Field::Nice | Field::PageFaults | Field::Ppid | Field::Times => &[R::Stat],
            Field::NumFds => &[R::FdList],
            Field::OpenFiles => &[R::FdList, R::OpenFiles],
            Field::Rlimit => &[R::Limits],
            Field::RlimitUsage => &[R::Stat, R::FdList, R::Status, R::Limits, R::RlimitUsage],
            Field::Terminal => &[R::Stat, R::Terminal],
            Field::Threads => &[R::Threads],
            Field::Username => &[R::Status, R::Username],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown field label.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    /// Parses a label case-insensitively (`"memoryinfoex"` works too).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_lists_each_field_once() {
        let unique: HashSet<Field> = Field::ALL.iter().copied().collect();
        assert_eq!(unique.len(), Field::ALL.len());
        assert_eq!(Field::ALL.len(), 37);

        let labels: HashSet<&str> = Field::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels.len(), Field::ALL.len());
    }

    #[test]
    fn test_label_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.label().parse::<Field>().unwrap(), *field);
            assert_eq!(field.to_string(), field.label());
        }
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("memoryinfoex".parse::<Field>().unwrap(), Field::MemoryInfoEx);
        assert_eq!("cpupercent".parse::<Field>().unwrap(), Field::CpuPercent);
        assert_eq!(" NumFDs ".parse::<Field>().unwrap(), Field::NumFds);
        assert!("Bogus".parse::<Field>().is_err());
    }

    #[test]
    fn test_resolver_lists_are_dependency_ordered() {
        for field in Field::ALL {
            let resolvers = field.resolvers();
            assert!(
                resolvers.windows(2).all(|w| w[0] < w[1]),
                "{} resolvers out of order",
                field
            );
        }
    }

    #[test]
    fn test_unimplemented_fields_have_no_resolvers() {
        assert!(Field::IoNice.resolvers().is_empty());
        assert_eq!(
            Field::Connections.resolvers(),
            &[Resolver::FdList, Resolver::Connections]
        );
    }
}
