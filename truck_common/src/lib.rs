//! Truck Common Library
//!
//! Shared constants and configuration loading utilities for the truck
//! control workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types (`CoreConfig`)
//! - [`consts`] - System-wide tunable defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! truck_common = { path = "../truck_common" }
//! ```
//!
//! ```rust
//! use truck_common::config::{ConfigLoader, CoreConfig};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
