//! Route planner micro-benchmark.
//!
//! Measures `compute_adjusted_setpoint` throughput both with no obstacles
//! in range (the common case) and with a single blocking obstacle that
//! forces the detour-waypoint computation on every call.

use criterion::{criterion_group, criterion_main, Criterion};

use truck_core::route_planner::{compute_adjusted_setpoint, Obstacle, RoutePlannerGains};

fn gains() -> RoutePlannerGains {
    RoutePlannerGains {
        avoidance_radius: 80,
        avoidance_margin: 20,
        look_ahead_distance: 200,
    }
}

fn bench_no_obstacles(c: &mut Criterion) {
    let gains = gains();
    c.bench_function("route_planner_no_obstacles", |b| {
        b.iter(|| compute_adjusted_setpoint(0, 0, 1000, 0, 50, &[], &gains));
    });
}

fn bench_blocking_obstacle(c: &mut Criterion) {
    let gains = gains();
    let obstacles = [Obstacle {
        id: 1,
        x: 50,
        y: 30,
    }];
    c.bench_function("route_planner_blocking_obstacle", |b| {
        b.iter(|| compute_adjusted_setpoint(0, 0, 1000, 0, 50, &obstacles, &gains));
    });
}

criterion_group!(benches, bench_no_obstacles, bench_blocking_obstacle);
criterion_main!(benches);
