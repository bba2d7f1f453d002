//! Differential CPU percent and memory percent calculations.

use crate::process::types::CpuTimes;
use std::time::Instant;

/// Cumulative CPU time observed at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    /// User plus system CPU seconds.
    pub total: f64,
    pub at: Instant,
}

impl CpuSample {
    pub fn new(times: &CpuTimes, at: Instant) -> Self {
        Self {
            total: times.total(),
            at,
        }
    }
}

/// CPU percent between two samples.
///
/// `100` means one core fully busy; the result is bounded by
/// `100 * num_cpu`. Identical instants and negative CPU deltas (counter
/// reset, PID reuse) give `0`.
pub fn calculate_percent(prev: &CpuSample, curr: &CpuSample, num_cpu: usize) -> f64 {
    let num_cpu = num_cpu.max(1) as f64;
    let elapsed = curr.at.saturating_duration_since(prev.at).as_secs_f64();
    let delta_wall = elapsed * num_cpu;
    if delta_wall == 0.0 {
        return 0.0;
    }

    let delta_cpu = curr.total - prev.total;
    if delta_cpu < 0.0 {
        return 0.0;
    }

    (delta_cpu / delta_wall) * 100.0 * num_cpu
}

/// Remembers the last sample for non-blocking percent calls.
#[derive(Debug, Clone, Default)]
pub struct CpuPercentTracker {
    last: Option<CpuSample>,
}

impl CpuPercentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&CpuSample> {
        self.last.as_ref()
    }

    /// Diffs `sample` against the stored one and stores `sample`.
    ///
    /// The first observation has nothing to diff against and returns `0`.
    pub fn observe(&mut self, sample: CpuSample, num_cpu: usize) -> f64 {
        let percent = match &self.last {
            Some(prev) => calculate_percent(prev, &sample, num_cpu),
            None => 0.0,
        };
        self.last = Some(sample);
        percent
    }

    pub fn store(&mut self, sample: CpuSample) {
        self.last = Some(sample);
    }
}

/// Average CPU percent over the whole life of a process.
///
/// Zero when the process is not older than `now_ms`.
pub fn lifetime_percent(total_cpu_secs: f64, create_time_ms: i64, now_ms: i64) -> f64 {
    let alive_secs = (now_ms - create_time_ms) as f64 / 1000.0;
    if alive_secs <= 0.0 {
        return 0.0;
    }
    100.0 * total_cpu_secs / alive_secs
}

/// Resident memory as a percentage of machine memory.
pub fn memory_percent(rss: u64, total_memory: u64) -> f32 {
    if total_memory == 0 {
        return 0.0;
    }
    (100.0 * rss as f64 / total_memory as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(total: f64, at: Instant) -> CpuSample {
        CpuSample { total, at }
    }

    #[test]
    fn test_identical_timestamps_give_zero() {
        let now = Instant::now();
        assert_eq!(calculate_percent(&sample(1.0, now), &sample(5.0, now), 4), 0.0);
    }

    #[test]
    fn test_one_core_busy() {
        let start = Instant::now();
        let end = start + Duration::from_secs(2);
        // 2 CPU seconds over 2 wall seconds
        let percent = calculate_percent(&sample(10.0, start), &sample(12.0, end), 8);
        assert!((percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_by_cpu_count() {
        let start = Instant::now();
        let end = start + Duration::from_secs(1);
        let percent = calculate_percent(&sample(0.0, start), &sample(4.0, end), 4);
        assert!((percent - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_delta_gives_zero() {
        let start = Instant::now();
        let end = start + Duration::from_secs(1);
        assert_eq!(calculate_percent(&sample(9.0, start), &sample(1.0, end), 2), 0.0);
    }

    #[test]
    fn test_tracker_first_observation_is_zero() {
        let start = Instant::now();
        let mut tracker = CpuPercentTracker::new();
        assert!(tracker.last().is_none());

        assert_eq!(tracker.observe(sample(1.0, start), 2), 0.0);
        assert_eq!(tracker.last().unwrap().total, 1.0);

        let percent = tracker.observe(sample(1.5, start + Duration::from_secs(1)), 2);
        assert!((percent - 50.0).abs() < 1e-9);
        assert_eq!(tracker.last().unwrap().total, 1.5);
    }

    #[test]
    fn test_tracker_replaces_sample_after_reset() {
        let start = Instant::now();
        let mut tracker = CpuPercentTracker::new();
        tracker.store(sample(100.0, start));

        assert_eq!(tracker.observe(sample(1.0, start + Duration::from_secs(1)), 1), 0.0);
        assert_eq!(tracker.last().unwrap().total, 1.0);
    }

    #[test]
    fn test_lifetime_percent() {
        assert_eq!(lifetime_percent(5.0, 10_000, 10_000), 0.0);
        assert_eq!(lifetime_percent(5.0, 20_000, 10_000), 0.0);
        assert!((lifetime_percent(5.0, 0, 10_000) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(512, 0), 0.0);
        assert!((memory_percent(256, 1024) - 25.0).abs() < 1e-6);
    }
}
