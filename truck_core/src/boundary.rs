//! Boundary I/O: file-based JSON exchange with the outside world.
//!
//! Inbound topics are read by polling a directory, picking the
//! lexicographically latest file whose name matches the topic, and
//! removing every matching file so stale or malformed drops are never
//! reprocessed. Outbound topics are written as timestamped JSON files,
//! skipped when unchanged from the last write except for a forced
//! refresh every [`truck_common::consts::FORCED_REFRESH_INTERVAL`]
//! iterations, so a silent consumer still sees liveness.
//!
//! Directory listing and filename-filter-then-sort selection follows the
//! discovery pattern used to enumerate segment files by name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use truck_common::consts::FORCED_REFRESH_INTERVAL;

use crate::command::{ActuatorCommand, TruckState};
use crate::route_planner::Obstacle;
use crate::sensor::RawSensorSample;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Wire shape for the inbound sensor topic.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct SensorWire {
    pub position_x: i32,
    pub position_y: i32,
    #[serde(rename = "angle_x")]
    pub heading: i32,
    pub temperature: i32,
    #[serde(default)]
    pub fault_electrical: bool,
    #[serde(default)]
    pub fault_hydraulic: bool,
}

impl From<SensorWire> for RawSensorSample {
    fn from(w: SensorWire) -> Self {
        RawSensorSample {
            position_x: w.position_x,
            position_y: w.position_y,
            heading: w.heading,
            temperature: w.temperature,
            fault_electrical: w.fault_electrical,
            fault_hydraulic: w.fault_hydraulic,
        }
    }
}

/// Wire shape for the inbound operator-command topic. Field names follow
/// the upstream wire contract, not the internal `OperatorCommand` names.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct OperatorCommandWire {
    #[serde(default)]
    pub auto_mode: bool,
    #[serde(default)]
    pub manual_mode: bool,
    #[serde(default)]
    pub rearm: bool,
    #[serde(default)]
    pub accelerate: i32,
    #[serde(default)]
    pub steer_left: i32,
    #[serde(default)]
    pub steer_right: i32,
}

/// The six recognized operator-command fields. A payload carrying none of
/// them is not a command at all and is discarded.
const OPERATOR_COMMAND_FIELDS: [&str; 6] = [
    "auto_mode",
    "manual_mode",
    "rearm",
    "accelerate",
    "steer_left",
    "steer_right",
];

/// Wire shape for the inbound setpoint topic.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct SetpointWire {
    pub target_x: i32,
    pub target_y: i32,
    pub target_speed: i32,
}

/// Wire shape for one entry of the inbound obstacles topic.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct ObstacleWire {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

impl From<ObstacleWire> for Obstacle {
    fn from(w: ObstacleWire) -> Self {
        Obstacle {
            id: w.id,
            x: w.x,
            y: w.y,
        }
    }
}

/// Outbound actuator-command wire shape. The `acceleration` field name is
/// inherited from the upstream wire contract; it carries a commanded
/// velocity, not an acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct ActuatorCommandWire {
    acceleration: i32,
    steering: i32,
    arrived: bool,
}

/// Outbound truck-state wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct TruckStateWire {
    automatic: bool,
    fault: bool,
}

struct OutboundSlot<T> {
    last: Option<T>,
    since_refresh: u32,
}

impl<T: PartialEq + Copy> OutboundSlot<T> {
    fn new() -> Self {
        Self {
            last: None,
            since_refresh: 0,
        }
    }

    /// Decide whether this value should actually be written: either it
    /// differs from the last write, or the forced-refresh interval has
    /// elapsed.
    fn should_write(&mut self, value: T) -> bool {
        let changed = self.last != Some(value);
        self.since_refresh += 1;
        let forced = self.since_refresh >= FORCED_REFRESH_INTERVAL;
        if changed || forced {
            self.last = Some(value);
            self.since_refresh = 0;
            true
        } else {
            false
        }
    }
}

/// File-based JSON boundary for one truck.
pub struct BoundaryIo {
    inbound_dir: PathBuf,
    outbound_dir: PathBuf,
    truck_id: u32,
    commands_slot: Mutex<OutboundSlot<ActuatorCommandWire>>,
    state_slot: Mutex<OutboundSlot<TruckStateWire>>,
}

impl BoundaryIo {
    /// Create a new boundary reader/writer rooted at the given inbound and
    /// outbound directories.
    pub fn new(inbound_dir: impl Into<PathBuf>, outbound_dir: impl Into<PathBuf>, truck_id: u32) -> Self {
        Self {
            inbound_dir: inbound_dir.into(),
            outbound_dir: outbound_dir.into(),
            truck_id,
            commands_slot: Mutex::new(OutboundSlot::new()),
            state_slot: Mutex::new(OutboundSlot::new()),
        }
    }

    fn topic_suffix(&self, topic: &str) -> String {
        format!("_truck_{}_{}.json", self.truck_id, topic)
    }

    /// List every file in the inbound directory matching `topic` for this
    /// truck, sorted lexicographically (oldest to newest by the
    /// timestamp-prefixed naming convention).
    fn matching_files(&self, topic: &str) -> Vec<PathBuf> {
        let suffix = self.topic_suffix(topic);
        let Ok(entries) = fs::read_dir(&self.inbound_dir) else {
            return Vec::new();
        };
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(&suffix))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        matches
    }

    /// Read the latest file for `topic`, if any, parse it as JSON, and
    /// remove every matching file from the inbound directory regardless of
    /// parse success. Malformed JSON is logged and discarded silently to
    /// the caller (returns `None`).
    fn read_latest<T: DeserializeOwned>(&self, topic: &str) -> Option<T> {
        let files = self.matching_files(topic);
        let latest = files.last().cloned();

        let result = latest.as_ref().and_then(|path| {
            let contents = fs::read_to_string(path).ok()?;
            match serde_json::from_str::<T>(&contents) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(module = "MA", topic, %err, "malformed inbound JSON discarded");
                    None
                }
            }
        });

        for path in &files {
            if let Err(err) = fs::remove_file(path) {
                debug!(module = "MA", path = %path.display(), %err, "failed to remove consumed inbound file");
            }
        }

        result
    }

    /// Read the latest sensor sample, if one has arrived.
    pub fn read_sensors(&self) -> Option<RawSensorSample> {
        self.read_latest::<SensorWire>("sensors").map(Into::into)
    }

    /// Read the latest operator command, if one has arrived. A payload
    /// lacking all six recognized fields (e.g. an empty or foreign object)
    /// is not a command and is discarded, same as malformed JSON.
    pub fn read_operator_command(&self) -> Option<crate::command::OperatorCommand> {
        let topic = "commands";
        let files = self.matching_files(topic);
        let latest = files.last().cloned();

        let result = latest.as_ref().and_then(|path| {
            let contents = fs::read_to_string(path).ok()?;
            let value: serde_json::Value = match serde_json::from_str(&contents) {
                Ok(value) => value,
                Err(err) => {
                    warn!(module = "MA", topic, %err, "malformed inbound JSON discarded");
                    return None;
                }
            };

            let has_recognized_field = value
                .as_object()
                .map(|obj| OPERATOR_COMMAND_FIELDS.iter().any(|key| obj.contains_key(*key)))
                .unwrap_or(false);
            if !has_recognized_field {
                warn!(module = "MA", topic, "inbound command has none of the recognized fields, discarded");
                return None;
            }

            match serde_json::from_value::<OperatorCommandWire>(value) {
                Ok(w) => Some(crate::command::OperatorCommand {
                    request_auto: w.auto_mode,
                    request_manual: w.manual_mode,
                    request_rearm: w.rearm,
                    accelerate: w.accelerate,
                    steer_left: w.steer_left,
                    steer_right: w.steer_right,
                }),
                Err(err) => {
                    warn!(module = "MA", topic, %err, "malformed inbound JSON discarded");
                    None
                }
            }
        });

        for path in &files {
            if let Err(err) = fs::remove_file(path) {
                debug!(module = "MA", path = %path.display(), %err, "failed to remove consumed inbound file");
            }
        }

        result
    }

    /// Read the latest target setpoint, if one has arrived.
    pub fn read_setpoint(&self) -> Option<(i32, i32, i32)> {
        self.read_latest::<SetpointWire>("setpoint")
            .map(|w| (w.target_x, w.target_y, w.target_speed))
    }

    /// Read the latest obstacle list, if one has arrived.
    pub fn read_obstacles(&self) -> Option<Vec<Obstacle>> {
        self.read_latest::<Vec<ObstacleWire>>("obstacles")
            .map(|list| list.into_iter().map(Into::into).collect())
    }

    fn write_json(&self, topic: &str, body: &impl Serialize) {
        let path: PathBuf = self
            .outbound_dir
            .join(format!("{}_truck_{}_{}.json", now_ms(), self.truck_id, topic));
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&path, bytes) {
                    warn!(module = "MA", topic, %err, "failed to write outbound JSON");
                }
            }
            Err(err) => warn!(module = "MA", topic, %err, "failed to serialize outbound JSON"),
        }
    }

    /// Write the actuator command if it has changed since the last write,
    /// or unconditionally every `FORCED_REFRESH_INTERVAL` calls.
    pub fn write_commands(&self, command: ActuatorCommand) {
        let wire = ActuatorCommandWire {
            acceleration: command.velocity,
            steering: command.steering,
            arrived: command.arrived,
        };
        let should = self
            .commands_slot
            .lock()
            .expect("boundary commands lock poisoned")
            .should_write(wire);
        if should {
            self.write_json("commands", &wire);
        }
    }

    /// Write the truck mode/fault state under the same change-detection
    /// and forced-refresh policy as [`Self::write_commands`].
    pub fn write_state(&self, truck_state: TruckState) {
        let wire = TruckStateWire {
            automatic: truck_state.automatic,
            fault: truck_state.fault,
        };
        let should = self
            .state_slot
            .lock()
            .expect("boundary state lock poisoned")
            .should_write(wire);
        if should {
            self.write_json("state", &wire);
        }
    }
}

fn ensure_dir(path: &Path) {
    let _ = fs::create_dir_all(path);
}

/// Create the inbound and outbound directories if they don't already
/// exist. Called once by Main at startup.
pub fn ensure_boundary_dirs(inbound_dir: &Path, outbound_dir: &Path) {
    ensure_dir(inbound_dir);
    ensure_dir(outbound_dir);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fresh_dirs() -> (tempfile::TempDir, tempfile::TempDir) {
        (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap())
    }

    #[test]
    fn reads_latest_sensor_sample_and_removes_matched_files() {
        let (inbound, outbound) = fresh_dirs();
        fs::write(
            inbound.path().join("100_truck_1_sensors.json"),
            r#"{"position_x":1,"position_y":2,"angle_x":3,"temperature":40}"#,
        )
        .unwrap();
        fs::write(
            inbound.path().join("200_truck_1_sensors.json"),
            r#"{"position_x":9,"position_y":9,"angle_x":9,"temperature":99}"#,
        )
        .unwrap();

        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        let sample = io.read_sensors().unwrap();
        assert_eq!(sample.position_x, 9);
        assert_eq!(fs::read_dir(inbound.path()).unwrap().count(), 0);
    }

    #[test]
    fn malformed_json_is_discarded_silently() {
        let (inbound, outbound) = fresh_dirs();
        fs::write(inbound.path().join("100_truck_1_sensors.json"), "not json").unwrap();

        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        assert!(io.read_sensors().is_none());
        assert_eq!(fs::read_dir(inbound.path()).unwrap().count(), 0);
    }

    #[test]
    fn topic_selection_ignores_other_topics_and_trucks() {
        let (inbound, outbound) = fresh_dirs();
        fs::write(
            inbound.path().join("100_truck_2_sensors.json"),
            r#"{"position_x":1,"position_y":1,"angle_x":1,"temperature":1}"#,
        )
        .unwrap();
        fs::write(
            inbound.path().join("100_truck_1_commands.json"),
            r#"{"auto_mode":true}"#,
        )
        .unwrap();

        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        assert!(io.read_sensors().is_none());
        let cmd = io.read_operator_command().unwrap();
        assert!(cmd.request_auto);
    }

    #[test]
    fn command_missing_all_recognized_fields_is_discarded() {
        let (inbound, outbound) = fresh_dirs();
        fs::write(
            inbound.path().join("100_truck_1_commands.json"),
            r#"{"unrelated_field":true}"#,
        )
        .unwrap();

        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        assert!(io.read_operator_command().is_none());
        assert_eq!(fs::read_dir(inbound.path()).unwrap().count(), 0);
    }

    #[test]
    fn command_with_single_recognized_field_is_accepted() {
        let (inbound, outbound) = fresh_dirs();
        fs::write(
            inbound.path().join("100_truck_1_commands.json"),
            r#"{"steer_left":15}"#,
        )
        .unwrap();

        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        let cmd = io.read_operator_command().unwrap();
        assert_eq!(cmd.steer_left, 15);
        assert!(!cmd.request_auto);
    }

    #[test]
    fn write_commands_skips_unchanged_writes() {
        let (inbound, outbound) = fresh_dirs();
        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        let cmd = ActuatorCommand {
            velocity: 10,
            steering: 0,
            arrived: false,
        };
        io.write_commands(cmd);
        io.write_commands(cmd);
        io.write_commands(cmd);
        // No change across 3 calls, below the forced-refresh interval of 4.
        let count = fs::read_dir(outbound.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn write_commands_forces_refresh_after_interval() {
        let (inbound, outbound) = fresh_dirs();
        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        let cmd = ActuatorCommand {
            velocity: 10,
            steering: 0,
            arrived: false,
        };
        for _ in 0..(FORCED_REFRESH_INTERVAL + 1) {
            io.write_commands(cmd);
        }
        let count = fs::read_dir(outbound.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn write_commands_writes_on_change() {
        let (inbound, outbound) = fresh_dirs();
        let io = BoundaryIo::new(inbound.path(), outbound.path(), 1);
        io.write_commands(ActuatorCommand {
            velocity: 10,
            steering: 0,
            arrived: false,
        });
        io.write_commands(ActuatorCommand {
            velocity: 20,
            steering: 0,
            arrived: false,
        });
        let count = fs::read_dir(outbound.path()).unwrap().count();
        assert_eq!(count, 2);
    }
}
