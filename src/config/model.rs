// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::dag::{DEFAULT_STEP_INCREMENT_SECS, Decomposer};
use crate::errors::{RascalError, Result};
use crate::model::{ActionPayload, Context, DeviceId, TriggerRequest, Variables};

/// Largest accepted `[scheduler].step_increment_ms` (one day).
pub const MAX_STEP_INCREMENT_MS: u64 = 24 * 60 * 60 * 1000;

/// Largest accepted `[routine.<id>].delay_ms` (thirty days).
pub const MAX_DELAY_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// devices = ["lamp1", "fan"]
///
/// [scheduler]
/// step_increment_ms = 10000
///
/// [executor]
/// action_duration_ms = 500
///
/// [routine.morning]
/// delay_ms = 0
/// variables = { brightness = 80 }
/// actions = [
///   { service = "light.turn_on", entity_id = "lamp1" },
///   { service = "fan.turn_on", target = { entity_id = "fan" } },
/// ]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Devices to register a queue for at startup.
    #[serde(default)]
    pub devices: Vec<DeviceId>,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub executor: ExecutorSection,

    /// Routines from `[routine.<id>]`, keyed by routine id.
    #[serde(default)]
    pub routine: BTreeMap<String, RoutineConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub devices: Vec<DeviceId>,
    pub scheduler: SchedulerSection,
    pub executor: ExecutorSection,
    pub routine: BTreeMap<String, RoutineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            devices: raw.devices,
            scheduler: raw.scheduler,
            executor: raw.executor,
            routine: raw.routine,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Spacing between consecutive steps of a routine, in milliseconds.
    #[serde(default = "default_step_increment_ms")]
    pub step_increment_ms: u64,
}

fn default_step_increment_ms() -> u64 {
    DEFAULT_STEP_INCREMENT_SECS as u64 * 1000
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            step_increment_ms: default_step_increment_ms(),
        }
    }
}

impl SchedulerSection {
    pub fn step_increment(&self) -> TimeDelta {
        i64::try_from(self.step_increment_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn decomposer(&self) -> Decomposer {
        Decomposer::with_step_increment(self.step_increment())
    }
}

/// `[executor]` section, read by the simulated executor.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// How long each simulated action takes.
    #[serde(default = "default_action_duration_ms")]
    pub action_duration_ms: u64,
}

fn default_action_duration_ms() -> u64 {
    500
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            action_duration_ms: default_action_duration_ms(),
        }
    }
}

impl ExecutorSection {
    pub fn action_duration(&self) -> Duration {
        Duration::from_millis(self.action_duration_ms)
    }
}

/// `[routine.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutineConfig {
    /// The ordered action script.
    pub actions: Vec<ActionPayload>,

    #[serde(default)]
    pub variables: Variables,

    #[serde(default)]
    pub context: Option<Context>,

    /// Offset from startup at which the routine is triggered.
    #[serde(default)]
    pub delay_ms: u64,
}

impl RoutineConfig {
    /// Build the trigger request for this routine, `delay_ms` after `now`.
    pub fn trigger_request(&self, id: &str, now: DateTime<Utc>) -> Result<TriggerRequest> {
        let trigger_time = i64::try_from(self.delay_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or_else(|| {
                RascalError::ConfigError(format!(
                    "routine '{id}' delay_ms = {} puts the trigger time out of range",
                    self.delay_ms
                ))
            })?;

        Ok(TriggerRequest {
            routine_id: id.to_string(),
            action_script: self.actions.clone(),
            variables: self.variables.clone(),
            context: self.context.clone(),
            trigger_time: Some(trigger_time),
        })
    }
}
