//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc`, `/dev` and `/etc` states for
//! exercising the procfs backend and process handles.

use super::filesystem::MockFs;

pub const INIT_PID: i32 = 1;
pub const BASH_PID: i32 = 1000;
pub const DAEMON_PID: i32 = 1001;

/// Device number of `/dev/pts/0` (major 136, minor 0).
pub const PTS0_DEV: u64 = 34816;

/// Shape of one fixture process. Everything not listed here is filled with
/// plausible constants.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub pid: i32,
    pub name: &'static str,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: u64,
    pub tpgid: i32,
    /// Clock ticks.
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
    pub priority: i64,
    pub uid: u32,
    /// Pages.
    pub size: u64,
    pub resident: u64,
    pub tids: &'static [i32],
    pub cmdline: &'static str,
    pub exe: &'static str,
    pub cwd: &'static str,
    pub fds: &'static [(&'static str, &'static str)],
}

impl Fixture {
    /// Content of `/proc/[pid]/stat`.
    pub fn stat_line(&self) -> String {
        format!(
            "{} ({}) {} {} {} {} {} {} 4194304 5000 50000 10 20 {} {} 0 0 {} 0 {} 0 {} {} {} \
             18446744073709551615 1 1 0 0 0 0 0 0 65536 0 0 0 17 0 0 0 5",
            self.pid,
            self.name,
            self.state,
            self.ppid,
            self.pgrp,
            self.session,
            self.tty_nr,
            self.tpgid,
            self.utime,
            self.stime,
            self.priority,
            self.tids.len(),
            self.starttime,
            self.size * 4096,
            self.resident,
        )
    }

    fn status(&self) -> String {
        let state = match self.state {
            'R' => "R (running)",
            'Z' => "Z (zombie)",
            'D' => "D (disk sleep)",
            _ => "S (sleeping)",
        };
        format!(
            "\
Name:\t{name}
Umask:\t0022
State:\t{state}
Tgid:\t{pid}
Ngid:\t0
Pid:\t{pid}
PPid:\t{ppid}
Uid:\t{uid}\t{uid}\t{uid}\t{uid}
Gid:\t{uid}\t{uid}\t{uid}\t{uid}
VmPeak:\t{peak:>8} kB
VmSize:\t{vms:>8} kB
VmLck:\t       0 kB
VmHWM:\t    9000 kB
VmRSS:\t{rss:>8} kB
VmData:\t    2000 kB
VmStk:\t     136 kB
VmSwap:\t       0 kB
Threads:\t{threads}
SigQ:\t0/63429
SigPnd:\t0000000000000000
ShdPnd:\t0000000000000000
SigBlk:\t0000000000010000
SigIgn:\t0000000000384004
SigCgt:\t000000004b813efb
voluntary_ctxt_switches:\t500
nonvoluntary_ctxt_switches:\t50
",
            name = self.name,
            pid = self.pid,
            ppid = self.ppid,
            uid = self.uid,
            peak = self.size * 4 + 1000,
            vms = self.size * 4,
            rss = self.resident * 4,
            threads = self.tids.len(),
        )
    }

    fn statm(&self) -> String {
        format!("{} {} 700 200 0 900 0\n", self.size, self.resident)
    }
}

pub fn init() -> Fixture {
    Fixture {
        pid: INIT_PID,
        name: "systemd",
        state: 'S',
        ppid: 0,
        pgrp: 1,
        session: 1,
        tty_nr: 0,
        tpgid: -1,
        utime: 500,
        stime: 300,
        starttime: 1,
        priority: 20,
        uid: 0,
        size: 42500,
        resident: 3000,
        tids: &[1],
        cmdline: "/sbin/init\0splash\0",
        exe: "/usr/lib/systemd/systemd",
        cwd: "/",
        fds: &[("0", "/dev/null"), ("1", "/dev/null"), ("2", "/dev/null")],
    }
}

/// Interactive shell in the foreground of `/dev/pts/0`.
pub fn bash() -> Fixture {
    Fixture {
        pid: BASH_PID,
        name: "bash",
        state: 'S',
        ppid: INIT_PID,
        pgrp: 1000,
        session: 1000,
        tty_nr: PTS0_DEV,
        tpgid: 1000,
        utime: 100,
        stime: 50,
        starttime: 100000,
        priority: 20,
        uid: 1000,
        size: 6000,
        resident: 1500,
        tids: &[1000],
        cmdline: "/bin/bash\0--login\0",
        exe: "/usr/bin/bash",
        cwd: "/home/user",
        fds: &[
            ("0", "/dev/pts/0"),
            ("1", "/dev/pts/0"),
            ("2", "/dev/pts/0"),
            ("255", "/dev/pts/0"),
        ],
    }
}

/// Background job of the shell whose name the kernel truncated.
pub fn daemon() -> Fixture {
    Fixture {
        pid: DAEMON_PID,
        name: "long-process-na",
        state: 'R',
        ppid: BASH_PID,
        pgrp: 1001,
        session: 1000,
        tty_nr: PTS0_DEV,
        tpgid: 1000,
        utime: 2000,
        stime: 700,
        starttime: 200000,
        priority: 20,
        uid: 1000,
        size: 20000,
        resident: 5000,
        tids: &[1001, 1003],
        cmdline: "/usr/lib/long-process-name-daemon\0--serve\0",
        exe: "/usr/lib/long-process-name-daemon",
        cwd: "/",
        fds: &[
            ("0", "/dev/null"),
            ("3", "/var/log/daemon.log"),
            ("4", "socket:[12345]"),
            ("5", "pipe:[999]"),
        ],
    }
}

/// Listening socket behind the daemon's `socket:[12345]` descriptor.
const DAEMON_TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 12345 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F91 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 99999 1 0000000000000000 100 0 0 10 0
";

const IO: &str = "\
rchar: 120000
wchar: 80000
syscr: 5000
syscw: 3000
read_bytes: 40960
write_bytes: 8192
cancelled_write_bytes: 0
";

const LIMITS: &str = "\
Limit                     Soft Limit           Hard Limit           Units
Max cpu time              unlimited            unlimited            seconds
Max file size             unlimited            unlimited            bytes
Max data size             unlimited            unlimited            bytes
Max stack size            8388608              unlimited            bytes
Max core file size        0                    unlimited            bytes
Max resident set          unlimited            unlimited            bytes
Max processes             63429                63429                processes
Max open files            1024                 4096                 files
Max locked memory         8388608              8388608              bytes
Max address space         unlimited            unlimited            bytes
Max file locks            unlimited            unlimited            locks
Max pending signals       63429                63429                signals
Max msgqueue size         819200               819200               bytes
Max nice priority         0                    0
Max realtime priority     0                    0
Max realtime timeout      unlimited            unlimited            us
";

const SMAPS: &str = "\
55d4c8a00000-55d4c8b2c000 r-xp 00000000 08:01 1835018                    /usr/bin/bash
Size:               1200 kB
Rss:                 900 kB
Pss:                 300 kB
Shared_Clean:        900 kB
Shared_Dirty:          0 kB
Private_Clean:         0 kB
Private_Dirty:         0 kB
Referenced:          900 kB
Anonymous:             0 kB
Swap:                  0 kB
VmFlags: rd ex mr mw me dw sd
55d4ca1f3000-55d4ca3a0000 rw-p 00000000 00:00 0                          [heap]
Size:               1716 kB
Rss:                 600 kB
Pss:                 600 kB
Shared_Clean:          0 kB
Shared_Dirty:          0 kB
Private_Clean:         0 kB
Private_Dirty:       600 kB
Referenced:          600 kB
Anonymous:           600 kB
Swap:                  0 kB
VmFlags: rd wr mr mw me ac sd
";

const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
";

impl MockFs {
    /// Adds a fixture process with every file the backend reads.
    pub fn add_fixture(&self, fixture: &Fixture) {
        let base = format!("/proc/{}", fixture.pid);
        self.add_process(
            fixture.pid,
            &fixture.stat_line(),
            &fixture.status(),
            &fixture.statm(),
            IO,
            fixture.cmdline,
        );
        self.add_file(format!("{}/limits", base), LIMITS);
        self.add_file(format!("{}/smaps", base), SMAPS);
        self.add_file(format!("{}/net/dev", base), NET_DEV);
        self.add_link(format!("{}/cwd", base), fixture.cwd);
        self.add_link(format!("{}/exe", base), fixture.exe);

        for (fd, target) in fixture.fds {
            self.add_link(format!("{}/fd/{}", base, fd), target);
        }
        for tid in fixture.tids {
            let thread = Fixture {
                pid: *tid,
                ..fixture.clone()
            };
            self.add_file(format!("{}/task/{}/stat", base, tid), thread.stat_line());
        }
    }

    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1), a bash shell on `/dev/pts/0` and a background
    /// daemon started from it. The shell also has descriptor 4 whose target
    /// cannot be read.
    pub fn typical_system() -> Self {
        let fs = Self::new();

        // /etc/passwd for user name resolution
        fs.add_file(
            "/etc/passwd",
            "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin
user:x:1000:1000:User:/home/user:/bin/bash
",
        );

        // System-wide files
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );
        fs.add_file("/proc/net/dev", NET_DEV);

        // Terminals
        fs.add_device("/dev/tty", 1280);
        fs.add_device("/dev/tty1", 1025);
        fs.add_device("/dev/null", 259);
        fs.add_device("/dev/pts/0", PTS0_DEV);
        fs.add_device("/dev/pts/ptmx", 1282);

        fs.add_fixture(&init());
        fs.add_fixture(&bash());
        fs.add_fixture(&daemon());
        fs.add_file("/proc/1000/fd/4", "");
        fs.add_file("/proc/1001/net/tcp", DAEMON_TCP);

        fs
    }

    /// Creates a system with processes that have special characters in names.
    pub fn with_special_names() -> Self {
        let fs = Self::typical_system();

        // Process with spaces in name (like Firefox's "Web Content")
        fs.add_process(
            5000,
            "5000 (Web Content) S 1 5000 5000 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 20 0 500000 2000000000 50000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tWeb Content
State:\tS (sleeping)
Tgid:\t5000
Pid:\t5000
PPid:\t1
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmSize:\t 2000000 kB
VmRSS:\t  200000 kB
Threads:\t20
",
            "500000 50000 2000 300 0 400000 0\n",
            IO,
            "/usr/lib/firefox/firefox\0-contentproc\0",
        );

        // Process with parentheses in name
        fs.add_process(
            5001,
            "5001 (my (weird) cmd) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 1 0 500100 10000000 1000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tmy (weird) cmd
State:\tS (sleeping)
Tgid:\t5001
Pid:\t5001
PPid:\t1
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmSize:\t   10000 kB
VmRSS:\t    4000 kB
Threads:\t1
",
            "2500 1000 300 100 0 500 0\n",
            "",
            "/usr/bin/weird\0",
        );

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::procfs::parser::{parse_proc_stat, parse_proc_status};

    #[test]
    fn test_fixture_files_parse() {
        for fixture in [init(), bash(), daemon()] {
            let stat = parse_proc_stat(&fixture.stat_line()).unwrap();
            assert_eq!(stat.pid, fixture.pid);
            assert_eq!(stat.comm, fixture.name);
            assert_eq!(stat.utime, fixture.utime);
            assert_eq!(stat.starttime, fixture.starttime);
            assert_eq!(stat.num_threads as usize, fixture.tids.len());
            assert_eq!(stat.delayacct_blkio_ticks, 5);

            let status = parse_proc_status(&fixture.status()).unwrap();
            assert_eq!(status.name, fixture.name);
            assert_eq!(status.ppid, fixture.ppid);
            assert_eq!(status.vm_rss, fixture.resident * 4096);
        }
    }

    #[test]
    fn test_typical_system_layout() {
        use crate::collector::traits::FileSystem;
        use std::path::Path;

        let fs = MockFs::typical_system();
        assert!(fs.exists(Path::new("/proc/1001/task/1003/stat")));
        assert!(fs.exists(Path::new("/proc/1000/fd/255")));
        assert_eq!(fs.device_id(Path::new("/dev/pts/0")).unwrap(), PTS0_DEV);
    }
}
