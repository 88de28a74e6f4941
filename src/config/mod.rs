//! Bounds Configuration Module
//!
//! Pipeline tunables loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `COMPLETION_BOUNDS_CONFIG` environment variable (path to TOML file)
//! 2. `completion_bounds.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded [`BoundsConfig`] is passed explicitly into the analyzer for
//! the lifetime of one run; there is no process-wide config state.

mod bounds_config;
pub mod defaults;
pub mod validation;

pub use bounds_config::*;
