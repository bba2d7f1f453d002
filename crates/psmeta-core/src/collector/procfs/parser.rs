//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, value.trim())))
}

/// Parses a trailing field that older kernels omit. Absent is zero.
fn optional_value<T: FromStr + Default>(name: &str, value: Option<&&str>) -> Result<T, ParseError> {
    match value {
        Some(value) => parse_value(name, value),
        None => Ok(T::default()),
    }
}

/// Parses a `"  1234 kB"` style value into bytes.
fn parse_kb_value(name: &str, value: &str) -> Result<u64, ParseError> {
    let number = value.trim().trim_end_matches("kB").trim();
    Ok(parse_value::<u64>(name, number)? * 1024)
}

fn parse_hex_value(name: &str, value: &str) -> Result<u64, ParseError> {
    u64::from_str_radix(value.trim(), 16)
        .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, value.trim())))
}

/// Parsed data from `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: i32,
    pub comm: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i64,
    pub tpgid: i32,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i32,
    pub num_threads: i32,
    pub starttime: u64,
    pub vsize: u64,
    pub rss: i64,
    pub rt_priority: u32,
    pub policy: u32,
    pub delayacct_blkio_ticks: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
///
/// Everything up to `rss` is mandatory; the trailing scheduling and
/// accounting fields default to zero on kernels that do not report them,
/// but must be numeric when present.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    // The comm field is enclosed by the first '(' and the last ')'
    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: i32 = parse_value("pid", &content[..open_paren])?;
    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 22 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 22+, got {}",
            fields.len()
        )));
    }

    let field = |idx: usize| fields[idx];

    Ok(ProcStat {
        pid,
        comm,
        state: field(0).chars().next().unwrap_or('?'),
        ppid: parse_value("ppid", field(1))?,
        pgrp: parse_value("pgrp", field(2))?,
        session: parse_value("session", field(3))?,
        tty_nr: parse_value("tty_nr", field(4))?,
        tpgid: parse_value("tpgid", field(5))?,
        minflt: parse_value("minflt", field(7))?,
        cminflt: parse_value("cminflt", field(8))?,
        majflt: parse_value("majflt", field(9))?,
        cmajflt: parse_value("cmajflt", field(10))?,
        utime: parse_value("utime", field(11))?,
        stime: parse_value("stime", field(12))?,
        cutime: parse_value("cutime", field(13))?,
        cstime: parse_value("cstime", field(14))?,
        priority: parse_value("priority", field(15))?,
        nice: parse_value("nice", field(16))?,
        num_threads: parse_value("num_threads", field(17))?,
        starttime: parse_value("starttime", field(19))?,
        vsize: parse_value("vsize", field(20))?,
        rss: parse_value("rss", field(21))?,
        rt_priority: optional_value("rt_priority", fields.get(37))?,
        policy: optional_value("policy", fields.get(38))?,
        delayacct_blkio_ticks: optional_value("delayacct_blkio_ticks", fields.get(39))?,
    })
}

/// Parsed data from `/proc/[pid]/status`.
///
/// Memory values are converted from kB to bytes, signal masks from hex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatus {
    pub name: String,
    pub state: String,
    pub ppid: i32,
    pub tgid: i32,
    pub uids: Vec<u32>,
    pub gids: Vec<u32>,
    pub threads: i32,
    pub voluntary_ctxt_switches: i64,
    pub nonvoluntary_ctxt_switches: i64,
    pub vm_rss: u64,
    pub vm_size: u64,
    pub vm_swap: u64,
    pub vm_hwm: u64,
    pub vm_data: u64,
    pub vm_stk: u64,
    pub vm_lck: u64,
    pub sig_pnd: u64,
    pub shd_pnd: u64,
    pub sig_blk: u64,
    pub sig_ign: u64,
    pub sig_cgt: u64,
}

fn parse_id_list(name: &str, value: &str) -> Result<Vec<u32>, ParseError> {
    value
        .split_whitespace()
        .map(|id| parse_value(name, id))
        .collect()
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is `Key:\tvalue` pairs, one per line. Unknown keys are ignored,
/// malformed values of known keys are errors.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut status = ProcStatus::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key {
            "Name" => status.name = value.to_string(),
            "State" => status.state = value.chars().take(1).collect(),
            "PPid" => status.ppid = parse_value(key, value)?,
            "Tgid" => status.tgid = parse_value(key, value)?,
            "Uid" => status.uids = parse_id_list(key, value)?,
            "Gid" => status.gids = parse_id_list(key, value)?,
            "Threads" => status.threads = parse_value(key, value)?,
            "voluntary_ctxt_switches" => status.voluntary_ctxt_switches = parse_value(key, value)?,
            "nonvoluntary_ctxt_switches" => {
                status.nonvoluntary_ctxt_switches = parse_value(key, value)?
            }
            "VmRSS" => status.vm_rss = parse_kb_value(key, value)?,
            "VmSize" => status.vm_size = parse_kb_value(key, value)?,
            "VmSwap" => status.vm_swap = parse_kb_value(key, value)?,
            "VmHWM" => status.vm_hwm = parse_kb_value(key, value)?,
            "VmData" => status.vm_data = parse_kb_value(key, value)?,
            "VmStk" => status.vm_stk = parse_kb_value(key, value)?,
            "VmLck" => status.vm_lck = parse_kb_value(key, value)?,
            "SigPnd" => status.sig_pnd = parse_hex_value(key, value)?,
            "ShdPnd" => status.shd_pnd = parse_hex_value(key, value)?,
            "SigBlk" => status.sig_blk = parse_hex_value(key, value)?,
            "SigIgn" => status.sig_ign = parse_hex_value(key, value)?,
            "SigCgt" => status.sig_cgt = parse_hex_value(key, value)?,
            _ => {}
        }
    }

    Ok(status)
}

/// Parsed data from `/proc/[pid]/statm`, in pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatm {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
    pub text: u64,
    pub lib: u64,
    pub data: u64,
    pub dirty: u64,
}

/// Parses `/proc/[pid]/statm` content.
///
/// Format: size resident shared text lib data dt (pages). The last column
/// is always zero on modern kernels and is optional here.
pub fn parse_proc_statm(content: &str) -> Result<ProcStatm, ParseError> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(ParseError::new(format!(
            "not enough fields in statm: expected 6+, got {}",
            fields.len()
        )));
    }

    Ok(ProcStatm {
        size: parse_value("size", fields[0])?,
        resident: parse_value("resident", fields[1])?,
        shared: parse_value("shared", fields[2])?,
        text: parse_value("text", fields[3])?,
        lib: parse_value("lib", fields[4])?,
        data: parse_value("data", fields[5])?,
        dirty: fields.get(6).map_or(Ok(0), |v| parse_value("dt", v))?,
    })
}

/// Parsed data from `/proc/[pid]/io`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcIo {
    pub rchar: u64,
    pub wchar: u64,
    pub syscr: u64,
    pub syscw: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub cancelled_write_bytes: u64,
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is key: value pairs, one per line.
pub fn parse_proc_io(content: &str) -> Result<ProcIo, ParseError> {
    let mut io = ProcIo::default();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let slot = match key {
                "rchar" => &mut io.rchar,
                "wchar" => &mut io.wchar,
                "syscr" => &mut io.syscr,
                "syscw" => &mut io.syscw,
                "read_bytes" => &mut io.read_bytes,
                "write_bytes" => &mut io.write_bytes,
                "cancelled_write_bytes" => &mut io.cancelled_write_bytes,
                _ => continue,
            };
            *slot = parse_value(key, value)?;
        }
    }

    Ok(io)
}

/// Splits `/proc/[pid]/cmdline` into arguments.
///
/// A single trailing NUL terminates the last argument; an empty file (kernel
/// threads, zombies) yields no arguments.
pub fn parse_cmdline(content: &[u8]) -> Vec<String> {
    let content = content.strip_suffix(b"\0").unwrap_or(content);
    if content.is_empty() {
        return Vec::new();
    }
    content
        .split(|b| *b == 0)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// One mapping from `/proc/[pid]/smaps`. Sizes are in kB, as the kernel
/// reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmapsRegion {
    pub path: String,
    pub size: u64,
    pub rss: u64,
    pub pss: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub private_clean: u64,
    pub private_dirty: u64,
    pub referenced: u64,
    pub anonymous: u64,
    pub swap: u64,
}

/// Parses `/proc/[pid]/smaps` content.
///
/// A line whose first token does not end with `:` starts a new region
/// (`address perms offset dev inode [path]`); the following `Key: N kB`
/// lines fill it in. The last region is flushed after the scan.
pub fn parse_smaps(content: &str) -> Result<Vec<SmapsRegion>, ParseError> {
    let mut regions = Vec::new();
    let mut current: Option<SmapsRegion> = None;

    for line in content.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        let Some(key) = first.strip_suffix(':') else {
            if let Some(done) = current.take() {
                regions.push(done);
            }
            let path = line.split_whitespace().skip(5).collect::<Vec<_>>().join(" ");
            current = Some(SmapsRegion {
                path,
                ..Default::default()
            });
            continue;
        };

        if key == "VmFlags" {
            continue;
        }

        let Some(region) = current.as_mut() else {
            return Err(ParseError::new(format!(
                "attribute {:?} before any mapping header",
                key
            )));
        };

        let slot = match key {
            "Size" => &mut region.size,
            "Rss" => &mut region.rss,
            "Pss" => &mut region.pss,
            "Shared_Clean" => &mut region.shared_clean,
            "Shared_Dirty" => &mut region.shared_dirty,
            "Private_Clean" => &mut region.private_clean,
            "Private_Dirty" => &mut region.private_dirty,
            "Referenced" => &mut region.referenced,
            "Anonymous" => &mut region.anonymous,
            "Swap" => &mut region.swap,
            _ => continue,
        };
        *slot = parse_value(key, tokens.next().unwrap_or_default())?;
    }

    if let Some(done) = current {
        regions.push(done);
    }

    Ok(regions)
}

/// Soft/hard limit value the kernel prints as `unlimited`.
pub const RLIM_INFINITY: i64 = i64::MAX;

/// One row of `/proc/[pid]/limits`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitEntry {
    pub name: String,
    pub soft: i64,
    pub hard: i64,
}

fn parse_limit_value(value: &str) -> Option<i64> {
    if value == "unlimited" {
        Some(RLIM_INFINITY)
    } else {
        value.parse().ok()
    }
}

/// Parses `/proc/[pid]/limits` content.
///
/// Format:
/// Limit                     Soft Limit           Hard Limit           Units
/// Max cpu time              unlimited            unlimited            seconds
/// Max nice priority         0                    0
pub fn parse_limits(content: &str) -> Result<Vec<LimitEntry>, ParseError> {
    let mut limits = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() || line.starts_with("Limit") {
            continue;
        }

        let mut tokens: Vec<&str> = line.split_whitespace().collect();

        // The units column is empty for some rows
        let mut hard = tokens.pop().and_then(parse_limit_value);
        if hard.is_none() {
            hard = tokens.pop().and_then(parse_limit_value);
        }
        let hard = hard.ok_or_else(|| ParseError::new(format!("invalid limits line: {:?}", line)))?;
        let soft = tokens
            .pop()
            .and_then(parse_limit_value)
            .ok_or_else(|| ParseError::new(format!("invalid limits line: {:?}", line)))?;

        limits.push(LimitEntry {
            name: tokens.join(" "),
            soft,
            hard,
        });
    }

    Ok(limits)
}

/// Parsed data from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_available: u64,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();

    let parse_kb = |line: &str| -> Result<u64, ParseError> {
        let value = line.split_whitespace().nth(1).unwrap_or_default();
        parse_value("meminfo value", value)
    };

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            info.mem_total = parse_kb(line)?;
        } else if line.starts_with("MemAvailable:") {
            info.mem_available = parse_kb(line)?;
        }
    }

    if info.mem_total == 0 {
        return Err(ParseError::new("MemTotal not found in meminfo"));
    }

    Ok(info)
}

/// Global stats from `/proc/stat` needed for per-process calculations.
#[derive(Debug, Clone, Default)]
pub struct GlobalStat {
    /// Number of `cpuN` lines.
    pub cpu_count: usize,
    /// Boot time, seconds since the epoch.
    pub btime: u64,
}

/// Parses `/proc/stat` content.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();
    let mut btime = None;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&key) = parts.first() else {
            continue;
        };

        if key
            .strip_prefix("cpu")
            .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        {
            stat.cpu_count += 1;
        } else if key == "btime" {
            btime = Some(parse_value("btime", parts.get(1).copied().unwrap_or_default())?);
        }
    }

    stat.btime = btime.ok_or_else(|| ParseError::new("btime not found in stat"))?;
    Ok(stat)
}

/// Parses `/etc/passwd` content and returns a map of UID -> username.
///
/// Format: username:password:uid:gid:gecos:home:shell
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        // Skip comments and empty lines
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            map.entry(uid).or_insert_with(|| parts[0].to_string());
        }
    }
    map
}

/// Resolver for UID -> username mapping.
#[derive(Debug, Clone, Default)]
pub struct UserResolver {
    uid_to_name: HashMap<u32, String>,
}

impl UserResolver {
    /// Creates a resolver from `/etc/passwd` content.
    pub fn from_passwd(content: &str) -> Self {
        Self {
            uid_to_name: parse_passwd(content),
        }
    }

    /// Resolves UID to username, returns UID as string if not found.
    pub fn resolve(&self, uid: u32) -> String {
        self.uid_to_name
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }
}

/// Parsed data from `/proc/[pid]/net/dev`.
#[derive(Debug, Clone, Default)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub rx_fifo: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
    pub tx_fifo: u64,
}

/// Parses `/proc/[pid]/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((interface, counters)) = line.split_once(':') else {
            return Err(ParseError::new(format!("invalid net/dev line: {:?}", line)));
        };
        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            return Err(ParseError::new(format!(
                "not enough fields for {}: expected 16, got {}",
                interface.trim(),
                values.len()
            )));
        }

        let get = |idx: usize, name: &str| parse_value::<u64>(name, values[idx]);

        devices.push(NetDevStats {
            interface: interface.trim().to_string(),
            rx_bytes: get(0, "rx_bytes")?,
            rx_packets: get(1, "rx_packets")?,
            rx_errs: get(2, "rx_errs")?,
            rx_drop: get(3, "rx_drop")?,
            rx_fifo: get(4, "rx_fifo")?,
            tx_bytes: get(8, "tx_bytes")?,
            tx_packets: get(9, "tx_packets")?,
            tx_errs: get(10, "tx_errs")?,
            tx_drop: get(11, "tx_drop")?,
            tx_fifo: get(12, "tx_fifo")?,
        });
    }

    Ok(devices)
}

/// One row of a `/proc/[pid]/net/{tcp,tcp6,udp,udp6,unix}` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetSocket {
    pub inode: u64,
    pub local_ip: String,
    pub local_port: u32,
    pub remote_ip: String,
    pub remote_port: u32,
    /// TCP state name, `NONE` for connectionless sockets.
    pub status: String,
    /// Socket type column of the unix table, zero for inet tables.
    pub socket_type: u32,
}

/// Decodes a kernel `ADDR:PORT` pair such as `0100007F:D1C2`.
///
/// The address is 8 (IPv4) or 32 (IPv6) hex digits, printed as 32-bit
/// words in host byte order. The port is plain hex.
pub fn decode_address(src: &str) -> Result<(IpAddr, u32), ParseError> {
    let invalid = || ParseError::new(format!("invalid socket address: {:?}", src));

    let (ip_hex, port_hex) = src.split_once(':').ok_or_else(invalid)?;
    let port = u32::from_str_radix(port_hex, 16).map_err(|_| invalid())?;
    if ip_hex.len() != 8 && ip_hex.len() != 32 {
        return Err(invalid());
    }

    let mut bytes = [0u8; 16];
    for (i, out) in bytes.chunks_exact_mut(4).take(ip_hex.len() / 8).enumerate() {
        let word = ip_hex.get(i * 8..i * 8 + 8).ok_or_else(invalid)?;
        let word = u32::from_str_radix(word, 16).map_err(|_| invalid())?;
        out.copy_from_slice(&word.to_ne_bytes());
    }

    let ip = if ip_hex.len() == 8 {
        IpAddr::from([bytes[0], bytes[1], bytes[2], bytes[3]])
    } else {
        IpAddr::from(bytes)
    };
    Ok((ip, port))
}

fn tcp_status(hex: &str) -> Result<&'static str, ParseError> {
    let state = u8::from_str_radix(hex, 16)
        .map_err(|_| ParseError::new(format!("invalid socket state: {:?}", hex)))?;
    Ok(match state {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECV",
        0x04 => "FIN_WAIT1",
        0x05 => "FIN_WAIT2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSE",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        _ => "",
    })
}

/// Parses `/proc/[pid]/net/{tcp,tcp6,udp,udp6}` content.
///
/// Format (header plus one socket per line):
///   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
///    0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000   999        0 12345 ...
pub fn parse_proc_net_inet(content: &str, tcp: bool) -> Result<Vec<NetSocket>, ParseError> {
    let mut sockets = Vec::new();

    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 10 {
            return Err(ParseError::new(format!(
                "not enough fields in socket line: expected 10+, got {}",
                parts.len()
            )));
        }

        let (local_ip, local_port) = decode_address(parts[1])?;
        let (remote_ip, remote_port) = decode_address(parts[2])?;
        let status = if tcp { tcp_status(parts[3])? } else { "NONE" };

        sockets.push(NetSocket {
            inode: parse_value("inode", parts[9])?,
            local_ip: local_ip.to_string(),
            local_port,
            remote_ip: remote_ip.to_string(),
            remote_port,
            status: status.to_string(),
            socket_type: 0,
        });
    }

    Ok(sockets)
}

/// Parses `/proc/[pid]/net/unix` content.
///
/// Format:
///   Num       RefCount Protocol Flags    Type St Inode Path
///   0000000000000000: 00000002 00000000 00010000 0001 01 23456 /run/systemd/journal/stdout
///
/// Unnamed sockets have no path column.
pub fn parse_proc_net_unix(content: &str) -> Result<Vec<NetSocket>, ParseError> {
    let mut sockets = Vec::new();

    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 7 {
            return Err(ParseError::new(format!(
                "not enough fields in unix socket line: expected 7+, got {}",
                parts.len()
            )));
        }

        let socket_type = u32::from_str_radix(parts[4], 16)
            .map_err(|_| ParseError::new(format!("invalid socket type: {:?}", parts[4])))?;

        sockets.push(NetSocket {
            inode: parse_value("inode", parts[6])?,
            local_ip: parts.get(7).map(|p| p.to_string()).unwrap_or_default(),
            status: "NONE".to_string(),
            socket_type,
            ..Default::default()
        });
    }

    Ok(sockets)
}

/// Extracts the inode from an fd link target like `socket:[12345]`.
pub fn parse_socket_inode(target: &str) -> Option<u64> {
    target
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
