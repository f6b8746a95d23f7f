//! System-wide constants for the truck control workspace.
//!
//! Single source of truth for all numeric defaults. Imported by
//! `truck_core` — no duplication permitted.

/// Default ring buffer capacity (filtered sensor samples).
pub const RING_BUFFER_CAPACITY: usize = 200;

/// Sensor Filter Task period [ms].
pub const SENSOR_FILTER_PERIOD_MS: u64 = 20;

/// Fault Detector Task period [ms].
pub const FAULT_DETECTOR_PERIOD_MS: u64 = 20;

/// Command/Mode Task period [ms].
pub const COMMAND_MODE_PERIOD_MS: u64 = 10;

/// Navigation Task period [ms].
pub const NAVIGATION_PERIOD_MS: u64 = 10;

/// Data Logger Task default period [ms] (allowed range 100-1000).
pub const DATA_LOGGER_PERIOD_MS: u64 = 500;

/// Local Snapshot Task default period [ms] (allowed range 100-2000).
pub const LOCAL_SNAPSHOT_PERIOD_MS: u64 = 1000;

/// Watchdog monitor check period [ms].
pub const WATCHDOG_CHECK_PERIOD_MS: u64 = 100;

/// Moving-average filter order (number of samples averaged).
pub const FILTER_ORDER: usize = 5;

/// Temperature threshold [°C] above which a warning fault is classified.
pub const TEMP_WARNING_THRESHOLD: i32 = 95;

/// Temperature threshold [°C] above which a critical fault is classified.
pub const TEMP_CRITICAL_THRESHOLD: i32 = 120;

/// Navigation arrival radius [position units].
pub const ARRIVAL_RADIUS: i32 = 5;

/// Heading alignment threshold [degrees] — rotating promotes to moving below this.
pub const ALIGNMENT_THRESHOLD_DEG: i32 = 5;

/// Heading re-alignment threshold [degrees] — moving demotes to rotating above this.
pub const REALIGNMENT_THRESHOLD_DEG: i32 = 10;

/// Cruise speed while moving [percent].
pub const CRUISE_SPEED_PERCENT: i32 = 30;

/// Rotation effort (steering magnitude) while rotating.
pub const ROTATION_EFFORT: i32 = 40;

/// Route planner obstacle avoidance radius [position units].
pub const AVOIDANCE_RADIUS: i32 = 80;

/// Route planner clearance margin added beyond the avoidance radius.
pub const AVOIDANCE_MARGIN: i32 = 20;

/// Route planner obstacle look-ahead distance along the path.
pub const LOOK_AHEAD_DISTANCE: i32 = 200;

/// Boundary output forced-refresh interval [iterations], even without change.
pub const FORCED_REFRESH_INTERVAL: u32 = 4;

/// Default watchdog per-task timeout [ms] when not overridden in `CoreConfig`.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 500;

/// Rolling window size for per-task execution-time statistics.
pub const PERF_WINDOW_SIZE: usize = 100;

/// Default inbound boundary directory.
pub const DEFAULT_INBOUND_DIR: &str = "boundary/in";

/// Default outbound boundary directory.
pub const DEFAULT_OUTBOUND_DIR: &str = "boundary/out";

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default truck identifier.
pub const DEFAULT_TRUCK_ID: u32 = 1;
