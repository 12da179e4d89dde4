#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::json;

use rascal::clock::mock::ManualClock;
use rascal::config::{
    ConfigFile, ExecutorSection, RawConfigFile, RoutineConfig, SchedulerSection,
};
use rascal::dag::Decomposer;
use rascal::model::{ActionPayload, Context, Routine, TriggerRequest, Variables};
use rascal::scheduler::Scheduler;

/// Fixed instant used as "now" by deterministic tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

/// Payload for `service` against `device`.
pub fn action(device: &str, service: &str) -> ActionPayload {
    let mut payload = ActionPayload::new();
    payload.insert("service".to_string(), json!(service));
    payload.insert("entity_id".to_string(), json!(device));
    payload
}

/// Payload using the nested `target: { entity_id }` form.
pub fn targeted_action(device: &str, service: &str) -> ActionPayload {
    let mut payload = ActionPayload::new();
    payload.insert("service".to_string(), json!(service));
    payload.insert("target".to_string(), json!({ "entity_id": device }));
    payload
}

/// A scheduler driven by a [`ManualClock`] set to [`t0`], with the default
/// 10 second step increment.
pub fn manual_scheduler() -> (Scheduler, ManualClock) {
    let clock = ManualClock::new(t0());
    let scheduler = Scheduler::new(Decomposer::default(), Arc::new(clock.clone()));
    (scheduler, clock)
}

/// Builder for `Routine` / `TriggerRequest` to simplify test setup.
pub struct RoutineBuilder {
    id: String,
    script: Vec<ActionPayload>,
    variables: Variables,
    context: Option<Context>,
    trigger_time: Option<DateTime<Utc>>,
}

impl RoutineBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            script: Vec::new(),
            variables: Variables::new(),
            context: None,
            trigger_time: None,
        }
    }

    pub fn action(mut self, device: &str, service: &str) -> Self {
        self.script.push(action(device, service));
        self
    }

    pub fn payload(mut self, payload: ActionPayload) -> Self {
        self.script.push(payload);
        self
    }

    pub fn variable(mut self, key: &str, value: serde_json::Value) -> Self {
        self.variables.insert(key.to_string(), value);
        self
    }

    pub fn context(mut self, id: &str) -> Self {
        self.context = Some(Context::new(id));
        self
    }

    pub fn at(mut self, trigger_time: DateTime<Utc>) -> Self {
        self.trigger_time = Some(trigger_time);
        self
    }

    /// Trigger `offset` after [`t0`].
    pub fn after_t0(self, offset: TimeDelta) -> Self {
        self.at(t0() + offset)
    }

    pub fn request(self) -> TriggerRequest {
        TriggerRequest {
            routine_id: self.id,
            action_script: self.script,
            variables: self.variables,
            context: self.context,
            trigger_time: self.trigger_time,
        }
    }

    /// Build the routine; without an explicit time it triggers at [`t0`].
    pub fn build(self) -> Routine {
        let trigger_time = self.trigger_time.unwrap_or_else(t0);
        Routine::new(self.id, self.script, self.variables, self.context, trigger_time)
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                devices: Vec::new(),
                scheduler: SchedulerSection::default(),
                executor: ExecutorSection::default(),
                routine: BTreeMap::new(),
            },
        }
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.config.devices.push(device.to_string());
        self
    }

    pub fn with_step_increment_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.step_increment_ms = ms;
        self
    }

    pub fn with_action_duration_ms(mut self, ms: u64) -> Self {
        self.config.executor.action_duration_ms = ms;
        self
    }

    pub fn with_routine(mut self, id: &str, actions: Vec<ActionPayload>) -> Self {
        self.config.routine.insert(
            id.to_string(),
            RoutineConfig {
                actions,
                variables: Variables::new(),
                context: None,
                delay_ms: 0,
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
