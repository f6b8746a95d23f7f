//! Bounded circular buffer of filtered sensor samples (T-RB).
//!
//! Overwrite-on-full: a write to a full buffer silently drops the oldest
//! element rather than blocking or failing. This trades data completeness
//! for strict producer liveness, which the Sensor Filter Task's period
//! depends on.
//!
//! `peek_latest` is the canonical read used by every periodic consumer: it
//! never blocks and returns a copy of the most recently written sample.
//! `read_blocking` pops the oldest element, waiting on a `Condvar` if the
//! buffer is empty; it exists for test/harness use only — no production
//! task uses it, since a blocking read is incompatible with a fixed period.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::sensor::FilteredSensorSample;

struct Inner {
    items: VecDeque<FilteredSensorSample>,
    capacity: usize,
    latest: Option<FilteredSensorSample>,
}

/// Bounded, lock-protected store of [`FilteredSensorSample`]s.
///
/// All operations are serialized by a single internal mutex, consistent
/// with the one-lock-per-entity discipline used throughout this core.
pub struct RingBuffer {
    inner: Mutex<Inner>,
    not_empty: Condvar,
}

impl RingBuffer {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                latest: None,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Push `sample` at the tail. If the buffer is full, the oldest
    /// element is dropped to make room. Never blocks.
    pub fn write(&self, sample: FilteredSensorSample) {
        let mut inner = self.inner.lock().expect("ring buffer lock poisoned");
        if inner.items.len() == inner.capacity {
            inner.items.pop_front();
        }
        inner.latest = Some(sample.clone());
        inner.items.push_back(sample);
        self.not_empty.notify_one();
    }

    /// Return a copy of the most recently written sample. Returns a
    /// zero-initialized sample if the buffer has never been written to.
    /// Never blocks.
    pub fn peek_latest(&self) -> FilteredSensorSample {
        let inner = self.inner.lock().expect("ring buffer lock poisoned");
        inner.latest.clone().unwrap_or_default()
    }

    /// Pop and return the oldest element, waiting until one is available
    /// if the buffer is currently empty. Intended for tests and harness
    /// use only.
    pub fn read_blocking(&self) -> FilteredSensorSample {
        let mut inner = self.inner.lock().expect("ring buffer lock poisoned");
        while inner.items.is_empty() {
            inner = self
                .not_empty
                .wait(inner)
                .expect("ring buffer condvar poisoned");
        }
        inner.items.pop_front().expect("checked non-empty above")
    }

    /// Current number of stored elements.
    pub fn size(&self) -> usize {
        self.inner.lock().expect("ring buffer lock poisoned").items.len()
    }

    /// True if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// True if the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock().expect("ring buffer lock poisoned");
        inner.items.len() == inner.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: i32) -> FilteredSensorSample {
        FilteredSensorSample {
            position_x: x,
            ..Default::default()
        }
    }

    #[test]
    fn starts_empty() {
        let rb = RingBuffer::new(4);
        assert!(rb.is_empty());
        assert_eq!(rb.size(), 0);
        assert!(!rb.is_full());
    }

    #[test]
    fn peek_latest_on_empty_returns_zeroed_sample() {
        let rb = RingBuffer::new(4);
        assert_eq!(rb.peek_latest(), FilteredSensorSample::default());
    }

    #[test]
    fn write_then_peek_returns_latest() {
        let rb = RingBuffer::new(4);
        rb.write(sample(1));
        rb.write(sample(2));
        assert_eq!(rb.peek_latest().position_x, 2);
        assert_eq!(rb.size(), 2);
    }

    #[test]
    fn overwrite_on_full_drops_oldest() {
        let rb = RingBuffer::new(2);
        rb.write(sample(1));
        rb.write(sample(2));
        assert!(rb.is_full());
        rb.write(sample(3));
        assert!(rb.is_full());
        assert_eq!(rb.peek_latest().position_x, 3);
        // The oldest (1) must no longer be observable via FIFO drain.
        assert_eq!(rb.read_blocking().position_x, 2);
        assert_eq!(rb.read_blocking().position_x, 3);
    }

    #[test]
    fn capacity_exactly_200_drops_first_on_201st_write() {
        let rb = RingBuffer::new(200);
        for i in 0..200 {
            rb.write(sample(i));
        }
        assert!(rb.is_full());
        rb.write(sample(200));
        assert_eq!(rb.size(), 200);
        // The 1st write (x=0) must have been evicted; next drain starts at 1.
        assert_eq!(rb.read_blocking().position_x, 1);
        assert_eq!(rb.peek_latest().position_x, 200);
    }

    #[test]
    fn fifo_order_preserved() {
        let rb = RingBuffer::new(10);
        for i in 0..5 {
            rb.write(sample(i));
        }
        for i in 0..5 {
            assert_eq!(rb.read_blocking().position_x, i);
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn read_blocking_waits_for_a_write() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let rb = Arc::new(RingBuffer::new(4));
        let rb2 = Arc::clone(&rb);
        let handle = thread::spawn(move || rb2.read_blocking());

        thread::sleep(Duration::from_millis(20));
        rb.write(sample(42));

        let got = handle.join().unwrap();
        assert_eq!(got.position_x, 42);
    }
}
