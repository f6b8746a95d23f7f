//! Data Logger Task: append-only CSV trail of truck state, written on its
//! own period plus on demand for fault and boundary events.
//!
//! No CSV-writing crate appears anywhere in the retrieved corpus, so rows
//! are written by hand against a fixed five-column schema. A file that
//! cannot be opened degrades the task to a silent no-op rather than
//! panicking or aborting the process — logging failures must never take
//! the control core down with them.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::command::TruckState;
use crate::sensor::FilteredSensorSample;

const HEADER: &str = "Timestamp,TruckID,State,PositionX,PositionY,Description\n";

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn state_label(truck_state: TruckState) -> &'static str {
    match (truck_state.fault, truck_state.automatic) {
        (true, _) => "FAULT",
        (false, true) => "AUTO",
        (false, false) => "MANUAL",
    }
}

/// Escape a description field for the CSV row: wrap in double quotes and
/// double any embedded quote whenever the field contains a comma, quote,
/// or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Data Logger Task: appends CSV rows to a log file, degrading to a no-op
/// if the file could not be opened.
pub struct DataLoggerTask {
    truck_id: u32,
    file: Mutex<Option<File>>,
}

impl DataLoggerTask {
    /// Open (creating if needed) the log file at `path` and write the
    /// header row if the file is new. On any I/O failure the task is left
    /// in degraded mode: every subsequent write is a silent no-op.
    pub fn new(path: impl AsRef<Path>, truck_id: u32) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let is_new = !path.exists();

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(mut f) => {
                if is_new {
                    if let Err(err) = f.write_all(HEADER.as_bytes()) {
                        warn!(module = "LI", %err, "failed to write log header, logger degraded");
                        None
                    } else {
                        Some(f)
                    }
                } else {
                    Some(f)
                }
            }
            Err(err) => {
                warn!(module = "LI", %err, path = %path.display(), "failed to open log file, logger degraded");
                None
            }
        };

        Self {
            truck_id,
            file: Mutex::new(file),
        }
    }

    fn write_row(&self, state: &str, position_x: i32, position_y: i32, description: &str) {
        let mut guard = self.file.lock().expect("logger lock poisoned");
        let Some(file) = guard.as_mut() else {
            return;
        };
        let row = format!(
            "{},{},{},{},{},{}\n",
            now_ms(),
            self.truck_id,
            state,
            position_x,
            position_y,
            escape_field(description),
        );
        if let Err(err) = file.write_all(row.as_bytes()) {
            warn!(module = "LI", %err, "log write failed, logger degraded");
            *guard = None;
        }
    }

    /// Run one periodic iteration: log the current sample and mode/fault
    /// state with an empty description.
    pub fn iterate(&self, sample: FilteredSensorSample, truck_state: TruckState) {
        self.write_row(
            state_label(truck_state),
            sample.position_x,
            sample.position_y,
            "",
        );
    }

    /// Log a one-off event (fault transition, boundary event) outside the
    /// task's normal period.
    pub fn log_event(&self, description: &str, sample: FilteredSensorSample, truck_state: TruckState) {
        self.write_row(
            state_label(truck_state),
            sample.position_x,
            sample.position_y,
            description,
        );
    }
}
