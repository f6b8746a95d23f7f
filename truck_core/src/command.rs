//! Command/Mode Task: integrates operator commands, the fault signal, and
//! navigation output into the truck's effective mode and final actuator
//! command.
//!
//! The mode/fault state machine mirrors the match-based transition-table
//! shape of a `handle_event(Event) -> TransitionResult` state machine:
//! three states, fault dominant, exactly one winning transition per event.

use std::sync::Mutex;

use tracing::info;

use crate::navigation::NavigationOutput;
use crate::sensor::FilteredSensorSample;

/// Operator-issued command, applied once by the Command/Mode Task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperatorCommand {
    /// Request transition to automatic mode.
    pub request_auto: bool,
    /// Request transition to manual mode.
    pub request_manual: bool,
    /// Acknowledge a fault and request rearm.
    pub request_rearm: bool,
    /// Manual-mode acceleration delta, percent.
    pub accelerate: i32,
    /// Manual-mode left steering delta, degrees.
    pub steer_left: i32,
    /// Manual-mode right steering delta, degrees.
    pub steer_right: i32,
}

/// Final actuator command produced by the Command/Mode Task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuatorCommand {
    /// Commanded velocity, percent, in [-100, 100].
    pub velocity: i32,
    /// Commanded steering, degrees, in [-180, 180].
    pub steering: i32,
    /// Arrival flag carried through from Navigation.
    pub arrived: bool,
}

/// Truck mode/fault snapshot published to Navigation, Logger, and Snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TruckState {
    /// True while a fault condition is active (dominant over mode).
    pub fault: bool,
    /// True while in automatic mode.
    pub automatic: bool,
}

/// The three reachable mode/fault states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFaultState {
    /// Manual mode, no active fault.
    ManualOk,
    /// Automatic mode, no active fault.
    AutoOk,
    /// Fault active — dominant over mode.
    Fault,
}

/// Events that can drive the mode/fault state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    /// Operator requested automatic mode.
    RequestAuto,
    /// Operator requested manual mode.
    RequestManual,
    /// The fault condition became true.
    FaultConditionRaised,
    /// Operator acknowledged the fault and the condition has cleared.
    Rearm,
}

/// Result of a mode/fault transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded — new state.
    Ok(ModeFaultState),
    /// Transition rejected — reason.
    Rejected(&'static str),
}

/// Mode/fault state machine: `{(manual, ok), (auto, ok), (fault)}`, fault
/// dominant over mode.
#[derive(Debug, Clone)]
pub struct ModeFaultStateMachine {
    state: ModeFaultState,
    /// Mode to restore on rearm (the mode active when the fault was raised).
    prior_automatic: bool,
}

impl ModeFaultStateMachine {
    /// Create a new state machine starting in manual mode, no fault.
    pub const fn new() -> Self {
        Self {
            state: ModeFaultState::ManualOk,
            prior_automatic: false,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> ModeFaultState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: ModeEvent) -> TransitionResult {
        use ModeEvent::*;
        use ModeFaultState::*;

        // Fault is dominant: it wins from any state.
        if event == FaultConditionRaised {
            if self.state != Fault {
                self.prior_automatic = self.state == AutoOk;
            }
            self.state = Fault;
            return TransitionResult::Ok(Fault);
        }

        let next = match (self.state, event) {
            (ManualOk, RequestAuto) => AutoOk,
            (AutoOk, RequestManual) => ManualOk,
            (Fault, Rearm) => {
                if self.prior_automatic {
                    AutoOk
                } else {
                    ManualOk
                }
            }
            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state, event)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

impl Default for ModeFaultStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_transition_reason(state: ModeFaultState, event: ModeEvent) -> &'static str {
    use ModeEvent::*;
    use ModeFaultState::*;
    match (state, event) {
        (ManualOk, RequestManual) => "already manual",
        (AutoOk, RequestAuto) => "already automatic",
        (Fault, RequestAuto) | (Fault, RequestManual) => "mode requests rejected while faulted",
        (ManualOk, Rearm) | (AutoOk, Rearm) => "rearm only valid while faulted",
        _ => "invalid event for current state",
    }
}

/// Command/Mode Task: maintains [`TruckState`] and produces the final
/// [`ActuatorCommand`] each iteration.
pub struct CommandModeTask {
    inner: Mutex<Inner>,
}

struct Inner {
    sm: ModeFaultStateMachine,
    pending: Option<OperatorCommand>,
    last_steering: i32,
    nav_output: NavigationOutput,
    last_command: ActuatorCommand,
    /// Latched once a rearm is requested while still faulted; consulted
    /// every later cycle so the rearm fires as soon as the fault condition
    /// clears, even without the operator resending the request.
    rearm_acknowledged: bool,
}

impl CommandModeTask {
    /// Create a new task, initially manual mode with no fault.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sm: ModeFaultStateMachine::new(),
                pending: None,
                last_steering: 0,
                nav_output: NavigationOutput::default(),
                last_command: ActuatorCommand::default(),
                rearm_acknowledged: false,
            }),
        }
    }

    /// Queue an operator command for application on the next iteration.
    pub fn submit_command(&self, command: OperatorCommand) {
        self.inner.lock().expect("command state lock poisoned").pending = Some(command);
    }

    /// Update the cached Navigation output, read by the next iteration
    /// while in automatic mode.
    pub fn set_navigation_output(&self, output: NavigationOutput) {
        self.inner.lock().expect("command state lock poisoned").nav_output = output;
    }

    /// The actuator command produced by the most recent [`Self::iterate`]
    /// call, for reporting purposes (e.g. the Local Snapshot Task).
    pub fn last_command(&self) -> ActuatorCommand {
        self.inner.lock().expect("command state lock poisoned").last_command
    }

    /// Current truck mode/fault snapshot.
    pub fn truck_state(&self) -> TruckState {
        let inner = self.inner.lock().expect("command state lock poisoned");
        TruckState {
            fault: inner.sm.state() == ModeFaultState::Fault,
            automatic: inner.sm.state() == ModeFaultState::AutoOk,
        }
    }

    /// Run one iteration: apply any pending command, recompute the fault
    /// condition from `sample`, and produce the final actuator command.
    pub fn iterate(
        &self,
        sample: FilteredSensorSample,
        temp_critical_threshold: i32,
    ) -> ActuatorCommand {
        let mut inner = self.inner.lock().expect("command state lock poisoned");

        let fault_condition = sample.temperature > temp_critical_threshold
            || sample.fault_electrical
            || sample.fault_hydraulic;

        if let Some(cmd) = inner.pending.take() {
            let was_manual = inner.sm.state() == ModeFaultState::ManualOk;
            if cmd.request_auto {
                let result = inner.sm.handle_event(ModeEvent::RequestAuto);
                if let TransitionResult::Rejected(reason) = result {
                    info!(module = "CL", reason, "mode request rejected");
                }
            }
            if cmd.request_manual {
                inner.sm.handle_event(ModeEvent::RequestManual);
            }
            if cmd.request_rearm && inner.sm.state() == ModeFaultState::Fault {
                inner.rearm_acknowledged = true;
            }
            // Manual deltas accumulate into steering; reset on transition
            // *into* manual so manual mode never inherits an automatic bias.
            if !was_manual && inner.sm.state() == ModeFaultState::ManualOk {
                inner.last_steering = 0;
            }
            if inner.sm.state() == ModeFaultState::ManualOk {
                inner.last_steering =
                    (inner.last_steering + cmd.steer_left - cmd.steer_right).clamp(-180, 180);
            }
            // Carry the accelerate delta forward for the manual-velocity
            // branch below, which takes it from `pending` this same tick.
            inner.pending = Some(OperatorCommand {
                accelerate: cmd.accelerate,
                ..Default::default()
            });
        }

        if fault_condition && inner.sm.state() != ModeFaultState::Fault {
            inner.sm.handle_event(ModeEvent::FaultConditionRaised);
            inner.rearm_acknowledged = false;
        } else if inner.sm.state() == ModeFaultState::Fault
            && inner.rearm_acknowledged
            && !fault_condition
        {
            inner.sm.handle_event(ModeEvent::Rearm);
            inner.rearm_acknowledged = false;
        }

        let arrived = inner.nav_output.arrived;
        let command = match inner.sm.state() {
            ModeFaultState::Fault => ActuatorCommand {
                velocity: 0,
                steering: 0,
                arrived,
            },
            ModeFaultState::AutoOk => ActuatorCommand {
                velocity: inner.nav_output.velocity,
                steering: inner.nav_output.steering,
                arrived,
            },
            ModeFaultState::ManualOk => {
                let accelerate = inner
                    .pending
                    .take()
                    .map(|c| c.accelerate)
                    .unwrap_or(0);
                ActuatorCommand {
                    velocity: accelerate.clamp(-100, 100),
                    steering: inner.last_steering,
                    arrived,
                }
            }
        };

        inner.last_command = command;
        command
    }
}

impl Default for CommandModeTask {
    fn default() -> Self {
        Self::new()
    }
}
