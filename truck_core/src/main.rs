//! Main Coordinator: wires every task together, runs them on dedicated OS
//! threads under absolute-deadline scheduling, and pumps boundary I/O on
//! the main thread until told to stop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

use truck_common::consts::DEFAULT_TRUCK_ID;
use truck_core::boundary::{ensure_boundary_dirs, BoundaryIo};
use truck_core::command::CommandModeTask;
use truck_core::config::CoreRuntimeConfig;
use truck_core::fault::FaultDetectorTask;
use truck_core::logger::DataLoggerTask;
use truck_core::logging::setup_tracing;
use truck_core::navigation::NavigationTask;
use truck_core::perf_monitor::PerformanceMonitor;
use truck_core::ring_buffer::RingBuffer;
use truck_core::route_planner::RoutePlanner;
use truck_core::sensor::SensorFilterTask;
use truck_core::snapshot::LocalSnapshotTask;
use truck_core::watchdog::Watchdog;

/// Real-time control core for an autonomous mining-haulage truck.
#[derive(Debug, Parser)]
#[command(name = "truck-core", about = "Autonomous truck control core")]
struct Args {
    /// Truck identifier, used to namespace boundary topic files.
    #[arg(default_value_t = DEFAULT_TRUCK_ID)]
    truck_id: u32,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Spawn a periodic task on its own thread under absolute-deadline
/// scheduling: the next wakeup is the previous wakeup plus the nominal
/// period, so one slow iteration never lets drift accumulate across
/// iterations. Registers the task with both the watchdog and the
/// performance monitor before the first iteration.
fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    running: Arc<AtomicBool>,
    watchdog: Arc<Watchdog>,
    perf: Arc<PerformanceMonitor>,
    watchdog_timeout: Duration,
    mut body: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    watchdog.register(name, watchdog_timeout);
    perf.register(name, period.as_micros() as u64);

    thread::spawn(move || {
        let mut next_wake = Instant::now();
        while running.load(Ordering::Relaxed) {
            let iter_start = Instant::now();
            body();
            let duration = iter_start.elapsed();

            perf.record(name, duration.as_micros() as u64);
            watchdog.heartbeat(name);

            next_wake += period;
            let now = Instant::now();
            if next_wake > now {
                thread::sleep(next_wake - now);
            } else {
                // Fell behind: resynchronize instead of scheduling a burst
                // of back-to-back catch-up iterations.
                next_wake = now;
            }
        }
    })
}

fn main() {
    let args = Args::parse();
    setup_tracing();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("truck_core.toml"));
    let (runtime_config, config_error) = CoreRuntimeConfig::load_or_default(&config_path);
    if let Some(err) = &config_error {
        warn!(module = "MA", %err, path = %config_path.display(), "using default configuration");
    }
    let core = &runtime_config.core;

    let inbound_dir = PathBuf::from(&core.inbound_dir);
    let outbound_dir = PathBuf::from(&core.outbound_dir);
    ensure_boundary_dirs(&inbound_dir, &outbound_dir);

    let log_path = PathBuf::from(&core.log_dir).join(format!("truck_{}_log.csv", args.truck_id));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!(module = "MA", "shutdown signal received");
            running.store(false, Ordering::Relaxed);
        })
        .expect("failed to install signal handler");
    }

    let watchdog = Arc::new(Watchdog::new());
    Watchdog::install_current(Arc::clone(&watchdog));
    let perf = Arc::new(PerformanceMonitor::new(core.perf_window_size));

    let ring_buffer = Arc::new(RingBuffer::new(core.ring_buffer_capacity));
    let sensor_filter = Arc::new(SensorFilterTask::new(core.filter_order));
    let fault_detector = Arc::new(FaultDetectorTask::new(
        core.temp_warning_threshold,
        core.temp_critical_threshold,
    ));
    let command_mode = Arc::new(CommandModeTask::new());
    let navigation = Arc::new(NavigationTask::new(runtime_config.navigation_gains));
    let route_planner = Arc::new(RoutePlanner::new(runtime_config.route_planner_gains));
    let logger = Arc::new(DataLoggerTask::new(&log_path, args.truck_id));
    let snapshot = LocalSnapshotTask::new();
    let boundary = Arc::new(BoundaryIo::new(&inbound_dir, &outbound_dir, args.truck_id));

    {
        let logger = Arc::clone(&logger);
        let command_mode = Arc::clone(&command_mode);
        fault_detector.register_callback(move |kind, sample| {
            let truck_state = command_mode.truck_state();
            logger.log_event(&format!("fault:{kind:?}"), sample, truck_state);
        });
    }

    let watchdog_timeout = Duration::from_millis(core.watchdog_timeout_ms);
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let sensor_filter = Arc::clone(&sensor_filter);
        spawn_periodic(
            "sensor_filter",
            runtime_config.periods.sensor_filter,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let filtered = sensor_filter.iterate();
                ring_buffer.write(filtered);
            },
        )
    });

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let fault_detector = Arc::clone(&fault_detector);
        spawn_periodic(
            "fault_detector",
            runtime_config.periods.fault_detector,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let sample = ring_buffer.peek_latest();
                fault_detector.iterate(sample);
            },
        )
    });

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let route_planner = Arc::clone(&route_planner);
        let navigation = Arc::clone(&navigation);
        let command_mode = Arc::clone(&command_mode);
        spawn_periodic(
            "navigation",
            runtime_config.periods.navigation,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let sample = ring_buffer.peek_latest();
                let setpoint = route_planner.get_setpoint(sample.position_x, sample.position_y);
                navigation.set_setpoint(setpoint);
                let truck_state = command_mode.truck_state();
                let output = navigation.iterate(sample, truck_state);
                command_mode.set_navigation_output(output);
            },
        )
    });

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let command_mode = Arc::clone(&command_mode);
        let boundary = Arc::clone(&boundary);
        let temp_critical = core.temp_critical_threshold;
        spawn_periodic(
            "command_mode",
            runtime_config.periods.command_mode,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let sample = ring_buffer.peek_latest();
                let command = command_mode.iterate(sample, temp_critical);
                boundary.write_commands(command);
                boundary.write_state(command_mode.truck_state());
            },
        )
    });

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let command_mode = Arc::clone(&command_mode);
        let logger = Arc::clone(&logger);
        spawn_periodic(
            "data_logger",
            runtime_config.periods.data_logger,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let sample = ring_buffer.peek_latest();
                logger.iterate(sample, command_mode.truck_state());
            },
        )
    });

    handles.push({
        let ring_buffer = Arc::clone(&ring_buffer);
        let command_mode = Arc::clone(&command_mode);
        let fault_detector = Arc::clone(&fault_detector);
        spawn_periodic(
            "local_snapshot",
            runtime_config.periods.local_snapshot,
            Arc::clone(&running),
            Arc::clone(&watchdog),
            Arc::clone(&perf),
            watchdog_timeout,
            move || {
                let sample = ring_buffer.peek_latest();
                let truck_state = command_mode.truck_state();
                let fault_kind = fault_detector.current();
                let command = command_mode.last_command();
                snapshot.iterate(sample, truck_state, fault_kind, command);
            },
        )
    });

    let watchdog_handle = {
        let watchdog = Arc::clone(&watchdog);
        let running = Arc::clone(&running);
        let period = runtime_config.periods.watchdog_check;
        thread::spawn(move || watchdog.run(period, &running))
    };

    info!(module = "MA", truck_id = args.truck_id, "control core started");

    // Boundary I/O pump runs on the main thread: inbound topics feed the
    // shared tasks, outbound writes happen inside the periodic tasks
    // above. Reuses the navigation period as its own poll cadence.
    let boundary_period = runtime_config.periods.navigation;
    let mut next_wake = Instant::now();
    while running.load(Ordering::Relaxed) {
        if let Some(sample) = boundary.read_sensors() {
            sensor_filter.set_raw_sample(sample);
        }
        if let Some(command) = boundary.read_operator_command() {
            command_mode.submit_command(command);
        }
        if let Some((target_x, target_y, target_speed)) = boundary.read_setpoint() {
            route_planner.set_target(target_x, target_y, target_speed);
        }
        if let Some(obstacles) = boundary.read_obstacles() {
            route_planner.update_obstacles(obstacles);
        }

        next_wake += boundary_period;
        let now = Instant::now();
        if next_wake > now {
            thread::sleep(next_wake - now);
        } else {
            next_wake = now;
        }
    }

    info!(module = "MA", "shutting down, joining tasks");
    for handle in handles {
        let _ = handle.join();
    }
    let _ = watchdog_handle.join();

    info!(module = "MA", "\n{}", perf.report());
}
