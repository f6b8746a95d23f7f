//! # Truck Control Core Library
//!
//! Real-time control core for an autonomous mining-haulage truck. Ingests
//! filtered sensor samples, runs a mode/fault state machine, and issues
//! closed-loop actuator commands that track externally supplied waypoints
//! while avoiding obstacles.
//!
//! ## Architecture
//!
//! - [`ring_buffer`] — bounded overwrite-on-full store of filtered samples
//! - [`perf_monitor`] — per-task execution-time statistics
//! - [`watchdog`] — heartbeat-based task liveness monitor
//! - [`sensor`] — periodic moving-average sensor filter
//! - [`fault`] — fault classification + edge-triggered observer callbacks
//! - [`command`] — mode/fault state machine and actuator arbitration
//! - [`navigation`] — rotate-then-translate waypoint controller
//! - [`route_planner`] — single-obstacle contouring
//! - [`logger`] — structured CSV event log
//! - [`snapshot`] — consolidated status reporting
//! - [`boundary`] — file-based JSON inbound/outbound I/O
//! - [`logging`] — custom `tracing` console formatter
//! - [`config`] — core configuration glue
//!
//! Every periodic task runs on its own OS thread using absolute-deadline
//! scheduling: the next wakeup is the previous wakeup plus the nominal
//! period, so a single slow iteration never causes drift to accumulate.

pub mod boundary;
pub mod command;
pub mod config;
pub mod fault;
pub mod logger;
pub mod logging;
pub mod navigation;
pub mod perf_monitor;
pub mod ring_buffer;
pub mod route_planner;
pub mod sensor;
pub mod snapshot;
pub mod watchdog;
