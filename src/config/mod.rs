// src/config/mod.rs

//! Configuration loading and validation for rascal.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like known devices and a positive step
//!   increment (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ExecutorSection, MAX_DELAY_MS, MAX_STEP_INCREMENT_MS, RawConfigFile,
    RoutineConfig, SchedulerSection,
};
