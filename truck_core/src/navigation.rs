//! Navigation Task: rotate-then-translate path following toward a single
//! setpoint, with bumpless transfer when not in automatic mode.
//!
//! Follows the stateful-struct-plus-pure-compute-function construction:
//! [`nav_compute`] is a free function taking the current state and inputs
//! and returning the next state and output, and [`NavigationTask`] is the
//! thin, lockable wrapper that calls it each iteration.

use std::sync::Mutex;

use crate::command::TruckState;
use crate::sensor::FilteredSensorSample;

/// Target the Navigation Task steers toward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationSetpoint {
    /// Target position, x axis.
    pub target_x: i32,
    /// Target position, y axis.
    pub target_y: i32,
    /// Target speed, percent. Carried through for reporting; the
    /// rotate-then-translate controller itself always moves at the fixed
    /// cruise speed, not this value.
    pub target_speed: i32,
    /// Target heading, degrees — the bearing from the current position to
    /// `(target_x, target_y)` at the time the setpoint was last set.
    pub target_heading: i32,
}

/// Output of one Navigation iteration, consumed by Command/Mode while in
/// automatic mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationOutput {
    /// Commanded velocity, percent.
    pub velocity: i32,
    /// Commanded steering, degrees.
    pub steering: i32,
    /// True once within the arrival radius of the current setpoint.
    pub arrived: bool,
}

/// Rotate-then-translate sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// Rotating in place to align heading with the bearing to target.
    Rotating,
    /// Moving toward the target at cruise speed.
    Moving,
    /// Within the arrival radius; holding.
    Arrived,
}

/// Gains and thresholds used by [`nav_compute`].
#[derive(Debug, Clone, Copy)]
pub struct NavigationGains {
    /// Distance, in position units, within which the target counts as reached.
    pub arrival_radius: i32,
    /// Heading error, in degrees, below which Rotating yields to Moving.
    pub alignment_threshold_deg: i32,
    /// Heading error, in degrees, above which Moving yields back to Rotating.
    pub realignment_threshold_deg: i32,
    /// Cruise velocity commanded while Moving, percent.
    pub cruise_speed_percent: i32,
    /// Steering magnitude commanded while Rotating, degrees.
    pub rotation_effort: i32,
}

/// Bearing, in integer degrees (0 = east, increasing counter-clockwise),
/// from `(from_x, from_y)` to `(to_x, to_y)`.
pub fn heading_to_target(from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> i32 {
    let dx = (to_x - from_x) as f64;
    let dy = (to_y - from_y) as f64;
    dy.atan2(dx).to_degrees().round() as i32
}

/// Normalize a heading difference into `[-180, 180]`.
pub fn normalize_angle(angle_deg: i32) -> i32 {
    let mut a = angle_deg % 360;
    if a > 180 {
        a -= 360;
    } else if a < -180 {
        a += 360;
    }
    a
}

/// Pure compute step: given the current sub-state, sensor sample, setpoint,
/// and gains, return the next sub-state and the navigation output.
pub fn nav_compute(
    state: NavState,
    sample: &FilteredSensorSample,
    setpoint: &NavigationSetpoint,
    gains: &NavigationGains,
) -> (NavState, NavigationOutput) {
    let dx = setpoint.target_x - sample.position_x;
    let dy = setpoint.target_y - sample.position_y;
    let distance_sq = (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64);
    let arrival_sq = (gains.arrival_radius as i64) * (gains.arrival_radius as i64);

    if distance_sq <= arrival_sq {
        return (
            NavState::Arrived,
            NavigationOutput {
                velocity: 0,
                steering: 0,
                arrived: true,
            },
        );
    }

    let bearing = heading_to_target(sample.position_x, sample.position_y, setpoint.target_x, setpoint.target_y);
    let heading_error = normalize_angle(bearing - sample.heading);
    let abs_error = heading_error.abs();

    let next_state = match state {
        NavState::Arrived => NavState::Rotating,
        NavState::Rotating => {
            if abs_error <= gains.alignment_threshold_deg {
                NavState::Moving
            } else {
                NavState::Rotating
            }
        }
        NavState::Moving => {
            if abs_error > gains.realignment_threshold_deg {
                NavState::Rotating
            } else {
                NavState::Moving
            }
        }
    };

    let output = match next_state {
        NavState::Rotating => NavigationOutput {
            velocity: 0,
            steering: heading_error.clamp(-gains.rotation_effort, gains.rotation_effort),
            arrived: false,
        },
        NavState::Moving => NavigationOutput {
            velocity: gains.cruise_speed_percent,
            steering: heading_error,
            arrived: false,
        },
        NavState::Arrived => NavigationOutput {
            velocity: 0,
            steering: 0,
            arrived: true,
        },
    };

    (next_state, output)
}

struct Inner {
    state: NavState,
    setpoint: NavigationSetpoint,
}

/// Navigation Task: holds the rotate-then-translate sub-state and the
/// current setpoint, and produces one [`NavigationOutput`] per iteration.
pub struct NavigationTask {
    gains: NavigationGains,
    inner: Mutex<Inner>,
}

impl NavigationTask {
    /// Create a new task with the given gains, starting in the `Rotating`
    /// sub-state at the origin setpoint.
    pub fn new(gains: NavigationGains) -> Self {
        Self {
            gains,
            inner: Mutex::new(Inner {
                state: NavState::Rotating,
                setpoint: NavigationSetpoint::default(),
            }),
        }
    }

    /// Replace the current setpoint, normally written by the Route Planner.
    pub fn set_setpoint(&self, setpoint: NavigationSetpoint) {
        self.inner.lock().expect("navigation lock poisoned").setpoint = setpoint;
    }

    /// Current sub-state.
    pub fn state(&self) -> NavState {
        self.inner.lock().expect("navigation lock poisoned").state
    }

    /// Run one iteration. While not automatic (manual or fault), the task
    /// performs bumpless transfer: it resets to `Rotating`, pulls the
    /// setpoint's x/y/heading up to the current sensor position/heading so
    /// no stale far-off target survives the excursion, and reports a
    /// zeroed, non-arrived output.
    pub fn iterate(&self, sample: FilteredSensorSample, truck_state: TruckState) -> NavigationOutput {
        let mut inner = self.inner.lock().expect("navigation lock poisoned");

        if !truck_state.automatic || truck_state.fault {
            inner.state = NavState::Rotating;
            inner.setpoint.target_x = sample.position_x;
            inner.setpoint.target_y = sample.position_y;
            inner.setpoint.target_heading = sample.heading;
            return NavigationOutput::default();
        }

        let (next_state, output) = nav_compute(inner.state, &sample, &inner.setpoint, &self.gains);
        inner.state = next_state;
        output
    }
}
