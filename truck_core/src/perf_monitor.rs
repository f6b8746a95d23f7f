//! Per-task execution-time statistics and deadline-violation accounting.
//!
//! Generalizes [`crate::cycle`]-style single-loop timing (one `CycleStats`
//! per RT loop) to N independently tracked named tasks sharing one
//! monitor. Stats are kept over a bounded rolling window so long-running
//! processes don't grow memory or let stale outliers dominate the mean.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::warn;

/// Snapshot of one task's execution-time statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    /// Nominal period for this task, in microseconds.
    pub period_us: u64,
    /// Duration of the most recent iteration, in microseconds.
    pub last_us: u64,
    /// Minimum observed duration, in microseconds.
    pub min_us: u64,
    /// Maximum observed duration, in microseconds.
    pub max_us: u64,
    /// Mean duration over the current rolling window, in microseconds.
    pub mean_us: f64,
    /// Standard deviation over the current rolling window, in microseconds.
    pub stddev_us: f64,
    /// Total number of recorded iterations.
    pub iterations: u64,
    /// Number of iterations whose duration exceeded the nominal period.
    pub deadline_violations: u64,
    /// Worst overrun observed (duration minus period), in microseconds.
    pub worst_overrun_us: u64,
}

impl TaskStats {
    fn new(period_us: u64) -> Self {
        Self {
            period_us,
            last_us: 0,
            min_us: u64::MAX,
            max_us: 0,
            mean_us: 0.0,
            stddev_us: 0.0,
            iterations: 0,
            deadline_violations: 0,
            worst_overrun_us: 0,
        }
    }
}

struct Entry {
    period_us: u64,
    window: VecDeque<u64>,
    window_capacity: usize,
    last_us: u64,
    min_us: u64,
    max_us: u64,
    iterations: u64,
    deadline_violations: u64,
    worst_overrun_us: u64,
}

impl Entry {
    fn record(&mut self, duration_us: u64) {
        self.iterations += 1;
        self.last_us = duration_us;
        if duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }

        if self.window.len() == self.window_capacity {
            self.window.pop_front();
        }
        self.window.push_back(duration_us);

        if duration_us > self.period_us {
            self.deadline_violations += 1;
            let overrun = duration_us - self.period_us;
            if overrun > self.worst_overrun_us {
                self.worst_overrun_us = overrun;
            }
            warn!(module = "FM", task = %"deadline_violation", duration_us, period_us = self.period_us, "deadline violation");
        } else if self.period_us > 0 && duration_us * 100 > self.period_us * 80 {
            warn!(module = "FM", duration_us, period_us = self.period_us, "high utilization");
        }
    }

    fn mean_and_stddev(&self) -> (f64, f64) {
        if self.window.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.window.len() as f64;
        let sum: u64 = self.window.iter().sum();
        let mean = sum as f64 / n;
        let variance = self
            .window
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        (mean, variance.sqrt())
    }

    fn snapshot(&self) -> TaskStats {
        let (mean_us, stddev_us) = self.mean_and_stddev();
        TaskStats {
            period_us: self.period_us,
            last_us: self.last_us,
            min_us: if self.min_us == u64::MAX { 0 } else { self.min_us },
            max_us: self.max_us,
            mean_us,
            stddev_us,
            iterations: self.iterations,
            deadline_violations: self.deadline_violations,
            worst_overrun_us: self.worst_overrun_us,
        }
    }
}

/// Tracks per-task execution-time statistics across the control core.
pub struct PerformanceMonitor {
    window_capacity: usize,
    tasks: Mutex<HashMap<String, Entry>>,
}

impl PerformanceMonitor {
    /// Create a new monitor with the given rolling-window capacity.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window_capacity,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Register a task with its nominal period, in microseconds. Safe to
    /// call more than once; re-registering resets the task's history.
    pub fn register(&self, task: &str, period_us: u64) {
        let mut tasks = self.tasks.lock().expect("perf monitor lock poisoned");
        tasks.insert(
            task.to_string(),
            Entry {
                period_us,
                window: VecDeque::with_capacity(self.window_capacity),
                window_capacity: self.window_capacity,
                last_us: 0,
                min_us: u64::MAX,
                max_us: 0,
                iterations: 0,
                deadline_violations: 0,
                worst_overrun_us: 0,
            },
        );
    }

    /// Record one iteration's execution time, in microseconds.
    pub fn record(&self, task: &str, duration_us: u64) {
        let mut tasks = self.tasks.lock().expect("perf monitor lock poisoned");
        if let Some(entry) = tasks.get_mut(task) {
            entry.record(duration_us);
        }
    }

    /// Return a point-in-time snapshot of a task's statistics.
    pub fn snapshot(&self, task: &str) -> Option<TaskStats> {
        let tasks = self.tasks.lock().expect("perf monitor lock poisoned");
        tasks.get(task).map(Entry::snapshot)
    }

    /// Render a tabular report of every registered task's statistics,
    /// printed by Main on shutdown.
    pub fn report(&self) -> String {
        let tasks = self.tasks.lock().expect("perf monitor lock poisoned");
        let mut names: Vec<&String> = tasks.keys().collect();
        names.sort();

        let mut out = String::from(
            "task                 iterations  last(us)  mean(us)  stddev  violations  worst_overrun(us)\n",
        );
        for name in names {
            let entry = &tasks[name];
            let s = entry.snapshot();
            out.push_str(&format!(
                "{name:<20} {iters:>10}  {last:>8}  {mean:>8.1}  {stddev:>6.1}  {viol:>10}  {worst:>17}\n",
                name = name,
                iters = s.iterations,
                last = s.last_us,
                mean = s.mean_us,
                stddev = s.stddev_us,
                viol = s.deadline_violations,
                worst = s.worst_overrun_us,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_task_records_are_ignored() {
        let pm = PerformanceMonitor::new(10);
        pm.record("unknown", 100);
        assert!(pm.snapshot("unknown").is_none());
    }

    #[test]
    fn basic_min_max_mean() {
        let pm = PerformanceMonitor::new(100);
        pm.register("sensor", 20_000);
        pm.record("sensor", 500);
        pm.record("sensor", 1500);

        let s = pm.snapshot("sensor").unwrap();
        assert_eq!(s.iterations, 2);
        assert_eq!(s.min_us, 500);
        assert_eq!(s.max_us, 1500);
        assert_eq!(s.mean_us, 1000.0);
        assert_eq!(s.last_us, 1500);
    }

    #[test]
    fn deadline_violation_counted_when_over_period() {
        let pm = PerformanceMonitor::new(100);
        pm.register("nav", 10_000);
        pm.record("nav", 15_000);
        let s = pm.snapshot("nav").unwrap();
        assert_eq!(s.deadline_violations, 1);
        assert_eq!(s.worst_overrun_us, 5_000);
    }

    #[test]
    fn window_is_bounded() {
        let pm = PerformanceMonitor::new(3);
        pm.register("t", 1_000);
        for i in 1..=5u64 {
            pm.record("t", i * 100);
        }
        // Only the last 3 samples (300, 400, 500) contribute to the mean.
        let s = pm.snapshot("t").unwrap();
        assert_eq!(s.mean_us, 400.0);
        assert_eq!(s.iterations, 5);
    }

    #[test]
    fn re_register_resets_history() {
        let pm = PerformanceMonitor::new(10);
        pm.register("t", 1_000);
        pm.record("t", 5_000);
        pm.register("t", 1_000);
        let s = pm.snapshot("t").unwrap();
        assert_eq!(s.iterations, 0);
    }
}
