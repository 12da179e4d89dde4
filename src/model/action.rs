// src/model/action.rs

use chrono::{DateTime, Utc};

use crate::model::{ActionId, DeviceId, RoutineId};

/// Opaque operation parameters. The scheduler only reads the target device.
pub type ActionPayload = serde_json::Map<String, serde_json::Value>;

/// Payload key naming the device an action operates on.
pub const CONFIG_ENTITY_ID: &str = "entity_id";

/// Payload key of the nested `target: { entity_id = ... }` form.
pub const CONFIG_TARGET: &str = "target";

/// One atomic operation inside a subroutine.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    id: Option<ActionId>,
    payload: ActionPayload,
    routine: RoutineId,
    start_time: DateTime<Utc>,
}

impl Action {
    pub fn new(
        id: Option<ActionId>,
        payload: ActionPayload,
        routine: impl Into<RoutineId>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payload,
            routine: routine.into(),
            start_time,
        }
    }

    /// `None` until the owning subroutine has been finalized.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    /// Id of the owning routine.
    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Device this action targets, read from `entity_id` or
    /// `target.entity_id`.
    pub fn target_device(&self) -> Option<DeviceId> {
        target_device_of(&self.payload)
    }

    pub(crate) fn assign_id_if_missing(&mut self, id: impl FnOnce() -> ActionId) {
        if self.id.is_none() {
            self.id = Some(id());
        }
    }
}

/// Extract the target device of a raw payload.
pub fn target_device_of(payload: &ActionPayload) -> Option<DeviceId> {
    if let Some(entity) = payload.get(CONFIG_ENTITY_ID).and_then(|v| v.as_str()) {
        return Some(entity.to_string());
    }

    payload
        .get(CONFIG_TARGET)
        .and_then(|t| t.get(CONFIG_ENTITY_ID))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
