//! Local Snapshot Task: periodically emits one consolidated structured log
//! event summarizing the truck's full status, for a human or a log
//! aggregator tailing the console — distinct from the Data Logger's
//! per-row CSV trail.

use tracing::info;

use crate::command::{ActuatorCommand, TruckState};
use crate::fault::FaultKind;
use crate::sensor::FilteredSensorSample;

/// Local Snapshot Task. Stateless: every iteration is a pure emission of
/// whatever is handed to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSnapshotTask;

impl LocalSnapshotTask {
    /// Create a new snapshot task.
    pub const fn new() -> Self {
        Self
    }

    /// Emit one consolidated status record.
    pub fn iterate(
        &self,
        sample: FilteredSensorSample,
        truck_state: TruckState,
        fault_kind: FaultKind,
        command: ActuatorCommand,
    ) {
        info!(
            module = "SS",
            position_x = sample.position_x,
            position_y = sample.position_y,
            heading = sample.heading,
            temperature = sample.temperature,
            automatic = truck_state.automatic,
            fault = truck_state.fault,
            ?fault_kind,
            velocity = command.velocity,
            steering = command.steering,
            arrived = command.arrived,
            "status snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterate_does_not_panic() {
        let task = LocalSnapshotTask::new();
        task.iterate(
            FilteredSensorSample::default(),
            TruckState::default(),
            FaultKind::None,
            ActuatorCommand::default(),
        );
    }
}
