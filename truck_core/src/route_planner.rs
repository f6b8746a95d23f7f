//! Route Planner: single-obstacle contouring around the direct line to the
//! current target.
//!
//! Side determination uses the sign of the 2-D cross product between the
//! direct-path vector and the vector to the obstacle, in standard
//! world-coordinate (right-handed, counter-clockwise-positive) convention:
//! a positive cross product means the obstacle sits to the left of the
//! direct path, and the detour routes to the right, and conversely. This
//! fixes an otherwise-ambiguous sign convention across the module.

use std::sync::Mutex;

use crate::navigation::{heading_to_target, NavigationSetpoint};

/// A single obstacle reported by the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Stable identifier, opaque to the planner.
    pub id: u32,
    /// Position, x axis.
    pub x: i32,
    /// Position, y axis.
    pub y: i32,
}

/// Gains used by [`compute_adjusted_setpoint`].
#[derive(Debug, Clone, Copy)]
pub struct RoutePlannerGains {
    /// Radius, in position units, the truck must keep clear of an obstacle.
    pub avoidance_radius: i32,
    /// Extra clearance added on top of `avoidance_radius`.
    pub avoidance_margin: i32,
    /// Distance ahead of the truck, along the direct path, to consider
    /// obstacles for.
    pub look_ahead_distance: i32,
}

/// Compute the setpoint the Navigation Task should steer toward: the raw
/// target, unless a single obstacle sits within `avoidance_radius` of the
/// direct path within the look-ahead window, in which case a detour
/// waypoint offset from the obstacle's own position by
/// `avoidance_radius + avoidance_margin`.
///
/// Only the nearest qualifying obstacle is contoured around — this is a
/// single-obstacle planner, not a full path-planning search.
pub fn compute_adjusted_setpoint(
    current_x: i32,
    current_y: i32,
    target_x: i32,
    target_y: i32,
    target_speed: i32,
    obstacles: &[Obstacle],
    gains: &RoutePlannerGains,
) -> NavigationSetpoint {
    let make_setpoint = |x: i32, y: i32| NavigationSetpoint {
        target_x: x,
        target_y: y,
        target_speed,
        target_heading: heading_to_target(current_x, current_y, x, y),
    };

    let dx = (target_x - current_x) as f64;
    let dy = (target_y - current_y) as f64;
    let path_len_sq = dx * dx + dy * dy;

    if path_len_sq < 1.0 {
        return make_setpoint(target_x, target_y);
    }
    let path_len = path_len_sq.sqrt();

    let mut nearest: Option<(f64, f64, i32, i32)> = None; // (distance_along_path, perp_dist, obstacle_x, obstacle_y)
    for obstacle in obstacles {
        let ox = (obstacle.x - current_x) as f64;
        let oy = (obstacle.y - current_y) as f64;

        let t = (ox * dx + oy * dy) / path_len_sq;
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let distance_along = t * path_len;
        if distance_along > gains.look_ahead_distance as f64 {
            continue;
        }

        let cross = dx * oy - dy * ox;
        let perp_dist = cross / path_len;
        if perp_dist.abs() >= gains.avoidance_radius as f64 {
            continue;
        }

        if nearest.map(|(d, _, _, _)| distance_along < d).unwrap_or(true) {
            nearest = Some((distance_along, perp_dist, obstacle.x, obstacle.y));
        }
    }

    let Some((_, perp_dist, obstacle_x, obstacle_y)) = nearest else {
        return make_setpoint(target_x, target_y);
    };

    // Unit perpendicular, 90 degrees counter-clockwise from the path
    // direction: (-dy, dx) / |d|, matching the cross-product convention.
    let perp_x = -dy / path_len;
    let perp_y = dx / path_len;

    let required = (gains.avoidance_radius + gains.avoidance_margin) as f64;
    // Route to the side opposite the obstacle.
    let side = if perp_dist >= 0.0 { -1.0 } else { 1.0 };
    let offset = side * required;

    let detour_x = (obstacle_x as f64 + perp_x * offset).round() as i32;
    let detour_y = (obstacle_y as f64 + perp_y * offset).round() as i32;
    make_setpoint(detour_x, detour_y)
}

struct Inner {
    target: (i32, i32, i32),
    obstacles: Vec<Obstacle>,
}

/// Route Planner: holds the current target and the latest obstacle list,
/// and produces the setpoint Navigation should steer toward.
pub struct RoutePlanner {
    gains: RoutePlannerGains,
    inner: Mutex<Inner>,
}

impl RoutePlanner {
    /// Create a new planner with the given gains, target at the origin,
    /// and no known obstacles.
    pub fn new(gains: RoutePlannerGains) -> Self {
        Self {
            gains,
            inner: Mutex::new(Inner {
                target: (0, 0, 0),
                obstacles: Vec::new(),
            }),
        }
    }

    /// Set the destination target and speed.
    pub fn set_target(&self, target_x: i32, target_y: i32, target_speed: i32) {
        self.inner.lock().expect("route planner lock poisoned").target =
            (target_x, target_y, target_speed);
    }

    /// Replace the known obstacle list, normally from the latest boundary
    /// read.
    pub fn update_obstacles(&self, obstacles: Vec<Obstacle>) {
        self.inner.lock().expect("route planner lock poisoned").obstacles = obstacles;
    }

    /// Compute the setpoint Navigation should steer toward, given the
    /// truck's current position. Speed is preserved unchanged through any
    /// obstacle detour.
    pub fn get_setpoint(&self, current_x: i32, current_y: i32) -> NavigationSetpoint {
        let inner = self.inner.lock().expect("route planner lock poisoned");
        compute_adjusted_setpoint(
            current_x,
            current_y,
            inner.target.0,
            inner.target.1,
            inner.target.2,
            &inner.obstacles,
            &self.gains,
        )
    }
}
