//! Sensor Filter Task: applies a moving-average filter to raw sensor
//! samples and publishes the result to the [`crate::ring_buffer::RingBuffer`].
//!
//! Filter style mirrors [`PidState`](crate::navigation)-like
//! stateful-struct-plus-pure-compute-function construction, generalized
//! to four independent channels (position x/y, heading, temperature).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Raw sensor reading as received from the boundary, before filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSensorSample {
    /// Position, x axis, integer units.
    pub position_x: i32,
    /// Position, y axis, integer units.
    pub position_y: i32,
    /// Heading, integer degrees, 0 = east, increasing counter-clockwise.
    pub heading: i32,
    /// Engine temperature, integer degrees Celsius.
    pub temperature: i32,
    /// Electrical fault flag.
    pub fault_electrical: bool,
    /// Hydraulic fault flag.
    pub fault_hydraulic: bool,
}

/// Filtered sensor sample stored in the ring buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilteredSensorSample {
    /// Position, x axis, integer units (moving-average filtered).
    pub position_x: i32,
    /// Position, y axis, integer units (moving-average filtered).
    pub position_y: i32,
    /// Heading, integer degrees (moving-average filtered).
    pub heading: i32,
    /// Engine temperature, integer degrees Celsius (moving-average filtered).
    pub temperature: i32,
    /// Electrical fault flag, passed through unfiltered.
    pub fault_electrical: bool,
    /// Hydraulic fault flag, passed through unfiltered.
    pub fault_hydraulic: bool,
    /// Wall-clock timestamp, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// Bounded moving-average filter of order `M`: the filtered value is the
/// integer mean of the last `M` raw values (fewer while the window fills).
#[derive(Debug, Clone)]
struct MovingAverage {
    window: VecDeque<i32>,
    order: usize,
}

impl MovingAverage {
    fn new(order: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(order.max(1)),
            order: order.max(1),
        }
    }

    fn push(&mut self, value: i32) -> i32 {
        if self.window.len() == self.order {
            self.window.pop_front();
        }
        self.window.push_back(value);
        let sum: i64 = self.window.iter().map(|&v| v as i64).sum();
        (sum / self.window.len() as i64) as i32
    }
}

/// Per-channel filter state, protected by a single lock (one consumer
/// thread at a time in practice, but the raw-slot/filter state share the
/// Sensor Filter Task's own lock in the global ordering).
struct FilterState {
    position_x: MovingAverage,
    position_y: MovingAverage,
    heading: MovingAverage,
    temperature: MovingAverage,
}

impl FilterState {
    fn new(order: usize) -> Self {
        Self {
            position_x: MovingAverage::new(order),
            position_y: MovingAverage::new(order),
            heading: MovingAverage::new(order),
            temperature: MovingAverage::new(order),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Sensor Filter Task: owns the raw-sample slot and filter state, and
/// produces one [`FilteredSensorSample`] per iteration.
pub struct SensorFilterTask {
    raw_slot: Mutex<RawSensorSample>,
    filter: Mutex<FilterState>,
}

impl SensorFilterTask {
    /// Create a new task with the given moving-average filter order.
    pub fn new(filter_order: usize) -> Self {
        Self {
            raw_slot: Mutex::new(RawSensorSample::default()),
            filter: Mutex::new(FilterState::new(filter_order)),
        }
    }

    /// Replace the current raw sample, called by Main as boundary input
    /// arrives.
    pub fn set_raw_sample(&self, sample: RawSensorSample) {
        *self.raw_slot.lock().expect("raw slot lock poisoned") = sample;
    }

    /// Run one filter iteration: copy the raw slot, apply the
    /// moving-average filter per channel, stamp the result, and return it
    /// for the caller to write into the ring buffer.
    pub fn iterate(&self) -> FilteredSensorSample {
        let raw = *self.raw_slot.lock().expect("raw slot lock poisoned");
        let mut filter = self.filter.lock().expect("filter lock poisoned");

        let filtered = FilteredSensorSample {
            position_x: filter.position_x.push(raw.position_x),
            position_y: filter.position_y.push(raw.position_y),
            heading: filter.heading.push(raw.heading),
            temperature: filter.temperature.push(raw.temperature),
            fault_electrical: raw.fault_electrical,
            fault_hydraulic: raw.fault_hydraulic,
            timestamp_ms: now_ms(),
        };

        debug!(module = "SP", temperature = filtered.temperature, "sensor filter iteration");
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_partial_window() {
        let mut ma = MovingAverage::new(5);
        assert_eq!(ma.push(10), 10);
        assert_eq!(ma.push(20), 15);
        assert_eq!(ma.push(30), 20);
    }

    #[test]
    fn moving_average_full_window_drops_oldest() {
        let mut ma = MovingAverage::new(3);
        ma.push(10);
        ma.push(20);
        ma.push(30);
        // Window full at [10, 20, 30], mean = 20.
        assert_eq!(ma.push(30), 20);
        // Push again: window becomes [20, 30, 30], mean = (20+30+30)/3 = 26.
        assert_eq!(ma.push(30), 26);
    }

    #[test]
    fn fault_flags_pass_through_unfiltered() {
        let task = SensorFilterTask::new(3);
        task.set_raw_sample(RawSensorSample {
            fault_electrical: true,
            fault_hydraulic: false,
            ..Default::default()
        });
        let filtered = task.iterate();
        assert!(filtered.fault_electrical);
        assert!(!filtered.fault_hydraulic);
    }

    #[test]
    fn iterate_stamps_a_nonzero_timestamp() {
        let task = SensorFilterTask::new(3);
        let filtered = task.iterate();
        assert!(filtered.timestamp_ms > 0);
    }

    #[test]
    fn updating_raw_sample_affects_next_iteration() {
        let task = SensorFilterTask::new(1);
        task.set_raw_sample(RawSensorSample {
            position_x: 100,
            ..Default::default()
        });
        assert_eq!(task.iterate().position_x, 100);
        task.set_raw_sample(RawSensorSample {
            position_x: 200,
            ..Default::default()
        });
        assert_eq!(task.iterate().position_x, 200);
    }
}
