//! Prelude module for common re-exports.
//!
//! Lets consumers do `use truck_common::prelude::*;` and get the most
//! important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use truck_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, CoreConfig, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FILTER_ORDER, RING_BUFFER_CAPACITY};
