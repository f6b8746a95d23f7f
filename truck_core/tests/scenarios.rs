//! End-to-end scenarios exercising multiple tasks together, without the
//! thread scheduling Main provides — each test drives the tasks directly,
//! call by call, to keep the scenario deterministic.

use truck_core::command::{ActuatorCommand, CommandModeTask, OperatorCommand};
use truck_core::fault::FaultDetectorTask;
use truck_core::navigation::{NavigationGains, NavigationSetpoint, NavigationTask};
use truck_core::ring_buffer::RingBuffer;
use truck_core::route_planner::{Obstacle, RoutePlanner, RoutePlannerGains};
use truck_core::sensor::{RawSensorSample, SensorFilterTask};
use truck_core::watchdog::Watchdog;

fn nav_gains() -> NavigationGains {
    NavigationGains {
        arrival_radius: 5,
        alignment_threshold_deg: 5,
        realignment_threshold_deg: 10,
        cruise_speed_percent: 30,
        rotation_effort: 40,
    }
}

fn route_gains() -> RoutePlannerGains {
    RoutePlannerGains {
        avoidance_radius: 80,
        avoidance_margin: 20,
        look_ahead_distance: 200,
    }
}

/// Scenario 1: happy-path automatic drive from start to arrival with no
/// faults and no obstacles.
#[test]
fn happy_path_drive_reaches_arrival() {
    let sensor_filter = SensorFilterTask::new(1);
    let ring_buffer = RingBuffer::new(50);
    let fault_detector = FaultDetectorTask::new(95, 120);
    let command_mode = CommandModeTask::new();
    let navigation = NavigationTask::new(nav_gains());
    let route_planner = RoutePlanner::new(route_gains());

    route_planner.set_target(100, 0, 30);
    command_mode.submit_command(OperatorCommand {
        request_auto: true,
        ..Default::default()
    });

    // Truck starts at the origin facing away from the target (90 degrees
    // off): it must rotate first, then move, then arrive.
    let mut x = 0i32;
    let mut heading = 90i32;
    let mut arrived = false;

    for _ in 0..500 {
        sensor_filter.set_raw_sample(RawSensorSample {
            position_x: x,
            position_y: 0,
            heading,
            temperature: 60,
            ..Default::default()
        });
        let filtered = sensor_filter.iterate();
        ring_buffer.write(filtered);

        fault_detector.iterate(filtered);

        let setpoint = route_planner.get_setpoint(filtered.position_x, filtered.position_y);
        navigation.set_setpoint(setpoint);
        let truck_state = command_mode.truck_state();
        let nav_output = navigation.iterate(filtered, truck_state);
        command_mode.set_navigation_output(nav_output);

        let command = command_mode.iterate(filtered, 120);
        if command.arrived {
            arrived = true;
            break;
        }

        // Crude kinematic integration: steering nudges heading toward 0,
        // velocity nudges x toward the target.
        heading += (command.steering.signum()) * 5;
        heading = heading.clamp(-180, 180);
        if command.velocity > 0 && heading.abs() <= nav_gains().alignment_threshold_deg {
            x += 2;
        }
    }

    assert!(arrived, "truck never reached the arrival radius");
    assert!(command_mode.truck_state().automatic);
}

/// Scenario 2: a temperature excursion above the critical threshold forces
/// the fault state and zeroes the actuator command regardless of mode.
#[test]
fn temperature_excursion_forces_fault_and_zero_command() {
    let command_mode = CommandModeTask::new();
    command_mode.submit_command(OperatorCommand {
        request_auto: true,
        ..Default::default()
    });
    command_mode.iterate(
        truck_core::sensor::FilteredSensorSample::default(),
        120,
    );
    assert!(command_mode.truck_state().automatic);

    let hot_sample = truck_core::sensor::FilteredSensorSample {
        temperature: 200,
        ..Default::default()
    };
    let command = command_mode.iterate(hot_sample, 120);

    assert!(command_mode.truck_state().fault);
    assert_eq!(command, ActuatorCommand {
        velocity: 0,
        steering: 0,
        arrived: false
    });
}

/// Scenario 3: an obstacle sitting on the direct path causes the Route
/// Planner to issue a detour setpoint rather than the raw target.
#[test]
fn obstacle_on_path_triggers_detour() {
    let route_planner = RoutePlanner::new(route_gains());
    route_planner.set_target(200, 0, 50);

    let direct = route_planner.get_setpoint(0, 0);
    assert_eq!(direct.target_x, 200);
    assert_eq!(direct.target_y, 0);
    assert_eq!(direct.target_speed, 50);

    route_planner.update_obstacles(vec![Obstacle {
        id: 1,
        x: 100,
        y: 20,
    }]);
    let detoured = route_planner.get_setpoint(0, 0);
    assert_ne!(detoured, direct);
}

/// Scenario 4: dropping from automatic to manual mid-rotation performs a
/// bumpless transfer — the navigation sub-state resets and the truck
/// immediately obeys manual input rather than resuming the stale maneuver.
#[test]
fn bumpless_transfer_from_automatic_to_manual() {
    let navigation = NavigationTask::new(nav_gains());
    let command_mode = CommandModeTask::new();
    navigation.set_setpoint(NavigationSetpoint {
        target_x: 100,
        target_y: 0,
        ..Default::default()
    });
    command_mode.submit_command(OperatorCommand {
        request_auto: true,
        ..Default::default()
    });
    command_mode.iterate(truck_core::sensor::FilteredSensorSample::default(), 120);

    let sample = truck_core::sensor::FilteredSensorSample {
        heading: 90,
        ..Default::default()
    };
    let truck_state = command_mode.truck_state();
    let nav_output = navigation.iterate(sample, truck_state);
    command_mode.set_navigation_output(nav_output);
    let command = command_mode.iterate(sample, 120);
    assert_eq!(command.velocity, 0); // still rotating in place

    command_mode.submit_command(OperatorCommand {
        request_manual: true,
        steer_left: 20,
        ..Default::default()
    });
    command_mode.iterate(sample, 120);
    let truck_state = command_mode.truck_state();
    assert!(!truck_state.automatic);

    let nav_output = navigation.iterate(sample, truck_state);
    assert_eq!(nav_output, truck_core::navigation::NavigationOutput::default());

    let command = command_mode.iterate(sample, 120);
    assert_eq!(command.steering, 20);

    // Re-entering automatic at the same position/heading the truck held
    // through the manual excursion, without the route planner writing a
    // fresh setpoint first, must not resume the stale 100-unit-away target:
    // bumpless transfer pulled the setpoint up to this position already, so
    // the truck arrives immediately instead of lurching into a steering
    // spike toward the far-off target.
    command_mode.submit_command(OperatorCommand {
        request_auto: true,
        ..Default::default()
    });
    command_mode.iterate(sample, 120);
    let truck_state = command_mode.truck_state();
    assert!(truck_state.automatic);
    let nav_output = navigation.iterate(sample, truck_state);
    assert!(nav_output.arrived);
}

/// Scenario 5: a task that stops heartbeating triggers a watchdog alert.
#[test]
fn stalled_task_triggers_watchdog_alert() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    let watchdog = Watchdog::new();
    let alerts = Arc::new(AtomicU32::new(0));
    let alerts2 = Arc::clone(&alerts);
    watchdog.set_fault_handler(move |_task, _elapsed_ms| {
        alerts2.fetch_add(1, Ordering::SeqCst);
    });

    watchdog.register("navigation", Duration::from_millis(10));
    watchdog.heartbeat("navigation");
    std::thread::sleep(Duration::from_millis(30));
    watchdog.check_once();

    assert_eq!(alerts.load(Ordering::SeqCst), 1);
    assert_eq!(watchdog.fault_count(), 1);
}

/// Scenario 6: a slow consumer falling behind the Sensor Filter Task does
/// not block producers — the ring buffer overwrites the oldest entries
/// and stays at capacity rather than growing unbounded.
#[test]
fn buffer_overflow_under_slow_consumer_keeps_latest() {
    let ring_buffer = RingBuffer::new(10);
    for i in 0..1_000 {
        ring_buffer.write(truck_core::sensor::FilteredSensorSample {
            position_x: i,
            ..Default::default()
        });
    }

    assert!(ring_buffer.is_full());
    assert_eq!(ring_buffer.size(), 10);
    assert_eq!(ring_buffer.peek_latest().position_x, 999);
}
