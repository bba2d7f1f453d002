//! psmeta - process metadata inspector.
//!
//! Prints process attributes read from /proc as JSON. Without PIDs it
//! reports on itself.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_os = "linux"))]
use psmeta_core::collector::MockFs;
#[cfg(target_os = "linux")]
use psmeta_core::collector::RealFs;
use psmeta_core::collector::{ProcfsBackend, ProcfsConfig};
use psmeta_core::process::{self, Field, Process, ProcessBackend, ProcessSnapshot};

/// Process metadata inspector.
#[derive(Parser)]
#[command(name = "psmeta", about = "Process metadata inspector", version)]
struct Args {
    /// PIDs to inspect. Defaults to the psmeta process itself.
    pids: Vec<i32>,

    /// Inspect every live process.
    #[arg(short, long, conflicts_with = "pids")]
    all: bool,

    /// Comma-separated fields to read (e.g. "Name,MemoryInfo,CPUPercent").
    /// All fields are read when omitted.
    #[arg(short, long, value_delimiter = ',', value_parser = parse_field)]
    fields: Vec<Field>,

    /// Also sample CPU percent over this many milliseconds.
    #[arg(short, long, value_name = "MS")]
    interval: Option<u64>,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc", env = "HOST_PROC")]
    proc_path: String,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// List field names and exit.
    #[arg(long)]
    list_fields: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_field(s: &str) -> Result<Field, String> {
    s.parse::<Field>().map_err(|e| e.to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    collected_at: String,
    processes: Vec<ProcessReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessReport {
    #[serde(flatten)]
    snapshot: ProcessSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampled_cpu_percent: Option<f64>,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so they never mix with the JSON on stdout.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["psmeta", "psmeta_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if args.list_fields {
        for field in Field::ALL {
            println!("{}", field);
        }
        return;
    }

    #[cfg(target_os = "linux")]
    let backend = ProcfsBackend::new(
        RealFs::new(),
        ProcfsConfig::from_env().with_proc_path(&args.proc_path),
    );

    #[cfg(not(target_os = "linux"))]
    let backend = {
        tracing::warn!("not running on Linux, reading a mock /proc tree");
        ProcfsBackend::new(
            MockFs::typical_system(),
            ProcfsConfig::default().with_proc_path(&args.proc_path),
        )
    };

    if let Err(e) = run(&backend, &args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run<B: ProcessBackend>(backend: &B, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let pids = if args.all {
        process::pids(backend)?
    } else if args.pids.is_empty() {
        vec![std::process::id() as i32]
    } else {
        args.pids.clone()
    };
    debug!(count = pids.len(), fields = ?args.fields, "inspecting processes");

    let sampled = match args.interval {
        Some(ms) => sample_cpu(backend, &pids, Duration::from_millis(ms)),
        None => BTreeMap::new(),
    };

    let mut processes = Vec::with_capacity(pids.len());
    for pid in pids {
        let opened = if args.fields.is_empty() {
            Process::new(pid, backend)
        } else {
            Process::with_fields(pid, backend, &args.fields)
        };

        let mut handle = match opened {
            Ok(handle) => handle,
            // a vanished process only matters when it was asked for by PID
            Err(e) if args.all && (e.is_process_gone() || e.is_permission_denied()) => {
                debug!(pid, error = %e, "skipping process");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        processes.push(ProcessReport {
            snapshot: handle.snapshot(),
            sampled_cpu_percent: sampled.get(&pid).copied(),
        });
    }

    info!(count = processes.len(), "collected process metadata");
    let report = Report {
        collected_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        processes,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}

/// Samples CPU percent of all `pids` over one shared interval.
fn sample_cpu<B: ProcessBackend>(
    backend: &B,
    pids: &[i32],
    interval: Duration,
) -> BTreeMap<i32, f64> {
    let mut handles: Vec<Process<&B>> = pids
        .iter()
        .filter_map(|pid| Process::new(*pid, backend).ok())
        .collect();

    for handle in &mut handles {
        if let Err(e) = handle.cpu_percent(Duration::ZERO) {
            debug!(pid = handle.pid(), error = %e, "no initial CPU sample");
        }
    }
    std::thread::sleep(interval);

    handles
        .iter_mut()
        .filter_map(|handle| {
            let percent = handle.cpu_percent(Duration::ZERO).ok()?;
            Some((handle.pid(), percent))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use psmeta_core::collector::MockFs;

    fn mock_backend() -> ProcfsBackend<MockFs> {
        ProcfsBackend::new(MockFs::typical_system(), ProcfsConfig::default())
    }

    #[test]
    fn test_fields_argument() {
        let args = Args::try_parse_from(["psmeta", "-f", "name,MemoryInfo,cpupercent", "1"]).unwrap();
        assert_eq!(
            args.fields,
            vec![Field::Name, Field::MemoryInfo, Field::CpuPercent]
        );
        assert_eq!(args.pids, vec![1]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Args::try_parse_from(["psmeta", "--fields", "Name,Bogus"]).is_err());
    }

    #[test]
    fn test_all_conflicts_with_pids() {
        assert!(Args::try_parse_from(["psmeta", "--all", "1"]).is_err());
    }

    #[test]
    fn test_run_all_processes() {
        let args = Args::try_parse_from(["psmeta", "--all", "--fields", "Name,Terminal"]).unwrap();
        assert!(run(&mock_backend(), &args).is_ok());
    }

    #[test]
    fn test_run_missing_pid_fails() {
        let args = Args::try_parse_from(["psmeta", "4242"]).unwrap();
        assert!(run(&mock_backend(), &args).is_err());
    }

    #[test]
    fn test_sample_cpu_skips_missing_processes() {
        let sampled = sample_cpu(&mock_backend(), &[1000, 4242], Duration::from_millis(5));
        assert_eq!(sampled.keys().copied().collect::<Vec<_>>(), vec![1000]);
        assert_eq!(sampled[&1000], 0.0);
    }
}
