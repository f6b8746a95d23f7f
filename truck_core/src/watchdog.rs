//! Heartbeat-based liveness monitor for the core's periodic tasks.
//!
//! Unlike a process supervisor (which restarts a dead child), this
//! watchdog observes in-process task heartbeats and raises a fault when
//! one goes stale. An entry that has never heartbeated is given a
//! bootstrap grace period — it is never reported as timed out until its
//! first heartbeat arrives, so a slow-starting task doesn't trip the
//! watchdog before it has run once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use tracing::error;

struct Entry {
    timeout: Duration,
    last_heartbeat: Instant,
    ever_reported: bool,
    consecutive_timeouts: u32,
}

type FaultHandler = dyn Fn(&str, u64) + Send + Sync;

/// Heartbeat table + monitor. One instance is normally shared across every
/// task via [`Watchdog::install_current`] / [`Watchdog::current`], so task
/// code can report a heartbeat without threading a reference through every
/// constructor.
pub struct Watchdog {
    table: Mutex<HashMap<String, Entry>>,
    fault_handler: Mutex<Box<FaultHandler>>,
    fault_count: Mutex<u64>,
}

static CURRENT: OnceLock<Arc<Watchdog>> = OnceLock::new();

impl Watchdog {
    /// Create a new watchdog with the default fault handler (logs a
    /// critical structured event).
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            fault_handler: Mutex::new(Box::new(default_fault_handler)),
            fault_count: Mutex::new(0),
        }
    }

    /// Install `self` as the process-wide current watchdog. No-op if one
    /// is already installed (first writer wins, matching `OnceLock`
    /// semantics).
    pub fn install_current(watchdog: Arc<Watchdog>) {
        let _ = CURRENT.set(watchdog);
    }

    /// The process-wide current watchdog, if one has been installed.
    pub fn current() -> Option<Arc<Watchdog>> {
        CURRENT.get().cloned()
    }

    /// Register a task with the given timeout.
    pub fn register(&self, task: &str, timeout: Duration) {
        let mut table = self.table.lock().expect("watchdog lock poisoned");
        table.insert(
            task.to_string(),
            Entry {
                timeout,
                last_heartbeat: Instant::now(),
                ever_reported: false,
                consecutive_timeouts: 0,
            },
        );
    }

    /// Record a heartbeat for `task`. A no-op if the task was never
    /// registered.
    pub fn heartbeat(&self, task: &str) {
        let mut table = self.table.lock().expect("watchdog lock poisoned");
        if let Some(entry) = table.get_mut(task) {
            entry.last_heartbeat = Instant::now();
            entry.ever_reported = true;
            entry.consecutive_timeouts = 0;
        }
    }

    /// Replace the fault handler invoked on timeout.
    pub fn set_fault_handler<F>(&self, handler: F)
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        *self.fault_handler.lock().expect("handler lock poisoned") = Box::new(handler);
    }

    /// Total number of timeouts observed since creation.
    pub fn fault_count(&self) -> u64 {
        *self.fault_count.lock().expect("fault count lock poisoned")
    }

    /// Scan every registered task once, firing the fault handler for any
    /// that has timed out. Resets `last_heartbeat` on timeout so a
    /// persistently dead task does not storm the handler every check.
    pub fn check_once(&self) {
        let now = Instant::now();
        let mut timed_out: Vec<(String, u64)> = Vec::new();

        {
            let mut table = self.table.lock().expect("watchdog lock poisoned");
            for (name, entry) in table.iter_mut() {
                if !entry.ever_reported {
                    continue;
                }
                let elapsed = now.saturating_duration_since(entry.last_heartbeat);
                if elapsed > entry.timeout {
                    entry.consecutive_timeouts += 1;
                    entry.last_heartbeat = now;
                    timed_out.push((name.clone(), elapsed.as_millis() as u64));
                }
            }
        }

        if timed_out.is_empty() {
            return;
        }

        let mut count = self.fault_count.lock().expect("fault count lock poisoned");
        let handler = self.fault_handler.lock().expect("handler lock poisoned");
        for (name, elapsed_ms) in timed_out {
            *count += 1;
            handler(&name, elapsed_ms);
        }
    }

    /// Run the monitor loop on the calling thread until `running` is
    /// cleared. Intended to be spawned on its own OS thread by Main.
    pub fn run(&self, check_period: Duration, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            self.check_once();
            std::thread::sleep(check_period);
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

fn default_fault_handler(task: &str, elapsed_ms: u64) {
    error!(module = "DC", task, elapsed_ms, "watchdog timeout");
}
