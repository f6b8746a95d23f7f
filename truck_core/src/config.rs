//! Binary-level config glue: loads [`truck_common::config::CoreConfig`] and
//! derives the `Duration`s and gain bundles each task constructor expects,
//! the way a loaded top-level config gets unpacked into per-component
//! runtime values.

use std::path::Path;
use std::time::Duration;

use truck_common::config::CoreConfig;

use crate::navigation::NavigationGains;
use crate::route_planner::RoutePlannerGains;

/// Task periods derived from [`CoreConfig`], in [`Duration`] form.
#[derive(Debug, Clone, Copy)]
pub struct TaskPeriods {
    pub sensor_filter: Duration,
    pub fault_detector: Duration,
    pub command_mode: Duration,
    pub navigation: Duration,
    pub data_logger: Duration,
    pub local_snapshot: Duration,
    pub watchdog_check: Duration,
}

/// Fully resolved runtime configuration for the control core binary.
#[derive(Debug, Clone)]
pub struct CoreRuntimeConfig {
    pub core: CoreConfig,
    pub periods: TaskPeriods,
    pub navigation_gains: NavigationGains,
    pub route_planner_gains: RoutePlannerGains,
}

impl CoreRuntimeConfig {
    /// Load configuration from `path`, falling back to defaults on any
    /// error (never fatal to the process), and derive the runtime values
    /// every component needs.
    pub fn load_or_default(path: &Path) -> (Self, Option<truck_common::config::ConfigError>) {
        let (core, error) = CoreConfig::load_or_default(path);
        (Self::from_core(core), error)
    }

    fn from_core(core: CoreConfig) -> Self {
        let periods = TaskPeriods {
            sensor_filter: Duration::from_millis(core.sensor_filter_period_ms),
            fault_detector: Duration::from_millis(core.fault_detector_period_ms),
            command_mode: Duration::from_millis(core.command_mode_period_ms),
            navigation: Duration::from_millis(core.navigation_period_ms),
            data_logger: Duration::from_millis(core.data_logger_period_ms),
            local_snapshot: Duration::from_millis(core.local_snapshot_period_ms),
            watchdog_check: Duration::from_millis(core.watchdog_check_period_ms),
        };

        let navigation_gains = NavigationGains {
            arrival_radius: core.arrival_radius,
            alignment_threshold_deg: core.alignment_threshold_deg,
            realignment_threshold_deg: core.realignment_threshold_deg,
            cruise_speed_percent: core.cruise_speed_percent,
            rotation_effort: core.rotation_effort,
        };

        let route_planner_gains = RoutePlannerGains {
            avoidance_radius: core.avoidance_radius,
            avoidance_margin: core.avoidance_margin,
            look_ahead_distance: core.look_ahead_distance,
        };

        Self {
            core,
            periods,
            navigation_gains,
            route_planner_gains,
        }
    }
}
