//! Fault Detector Task: classifies filtered sensor samples into a
//! [`FaultKind`] and notifies registered observers on edge transitions.
//!
//! Callback dispatch follows the match-based, priority-ordered style of
//! [`crate::command`]'s arbitration: exactly one classification wins per
//! iteration, in a fixed priority order. Registration is append-only and
//! callbacks run synchronously on the Fault Detector's own thread — they
//! must be non-blocking and must never re-enter the detector.

use std::sync::Mutex;

use tracing::warn;

use crate::sensor::FilteredSensorSample;

/// Fault classification produced by the Fault Detector Task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultKind {
    /// No fault condition present.
    #[default]
    None,
    /// Temperature above the warning threshold but below critical.
    TemperatureWarning,
    /// Temperature above the critical threshold.
    TemperatureCritical,
    /// Electrical fault flag set.
    Electrical,
    /// Hydraulic fault flag set.
    Hydraulic,
}

/// Classify a sample into a [`FaultKind`] using fixed priority:
/// temperature-critical > electrical > hydraulic > temperature-warning > none.
pub fn classify(
    sample: &FilteredSensorSample,
    warning_threshold: i32,
    critical_threshold: i32,
) -> FaultKind {
    if sample.temperature > critical_threshold {
        FaultKind::TemperatureCritical
    } else if sample.fault_electrical {
        FaultKind::Electrical
    } else if sample.fault_hydraulic {
        FaultKind::Hydraulic
    } else if sample.temperature > warning_threshold {
        FaultKind::TemperatureWarning
    } else {
        FaultKind::None
    }
}

type FaultCallback = dyn Fn(FaultKind, FilteredSensorSample) + Send + Sync;

/// Fault Detector Task: holds the current classification and the
/// observer callback list.
pub struct FaultDetectorTask {
    warning_threshold: i32,
    critical_threshold: i32,
    state: Mutex<FaultKind>,
    callbacks: Mutex<Vec<Box<FaultCallback>>>,
}

impl FaultDetectorTask {
    /// Create a new task with the given classification thresholds.
    pub fn new(warning_threshold: i32, critical_threshold: i32) -> Self {
        Self {
            warning_threshold,
            critical_threshold,
            state: Mutex::new(FaultKind::None),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer callback. Additive only — there is no
    /// deregistration during operation.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: Fn(FaultKind, FilteredSensorSample) + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .expect("callback list lock poisoned")
            .push(Box::new(callback));
    }

    /// Current classification.
    pub fn current(&self) -> FaultKind {
        *self.state.lock().expect("fault state lock poisoned")
    }

    /// Run one iteration: classify `sample`, and if the classification
    /// differs from the stored one, update it and — only for a non-`None`
    /// result — notify every registered callback. The re-`None` edge is
    /// intentionally silent (see `SPEC_FULL.md` §9 Open Questions).
    pub fn iterate(&self, sample: FilteredSensorSample) -> FaultKind {
        let new_kind = classify(&sample, self.warning_threshold, self.critical_threshold);

        let should_notify = {
            let mut state = self.state.lock().expect("fault state lock poisoned");
            if *state != new_kind {
                *state = new_kind;
                new_kind != FaultKind::None
            } else {
                false
            }
        };

        if should_notify {
            if new_kind == FaultKind::TemperatureCritical || new_kind == FaultKind::Electrical {
                warn!(module = "CB", ?new_kind, "fault edge detected");
            }
            let callbacks = self.callbacks.lock().expect("callback list lock poisoned");
            for callback in callbacks.iter() {
                callback(new_kind, sample);
            }
        }

        new_kind
    }
}
