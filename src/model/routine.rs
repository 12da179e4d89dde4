// src/model/routine.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::clock::Clock;
use crate::model::{ActionPayload, RoutineId};

/// Variable bindings passed along with a routine.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Execution context token used for cross-call correlation.
///
/// The scheduler never interprets it; it is handed to the execution layer
/// with every dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Context {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Context {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            user_id: None,
        }
    }
}

/// A routine construction request as it arrives from the host automation
/// engine.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub routine_id: RoutineId,
    pub action_script: Vec<ActionPayload>,
    pub variables: Variables,
    pub context: Option<Context>,
    /// Absent means "now", as reported by the host clock.
    pub trigger_time: Option<DateTime<Utc>>,
}

impl TriggerRequest {
    pub fn new(routine_id: impl Into<RoutineId>, action_script: Vec<ActionPayload>) -> Self {
        Self {
            routine_id: routine_id.into(),
            action_script,
            variables: Variables::new(),
            context: None,
            trigger_time: None,
        }
    }
}

/// One triggered automation instance.
///
/// The trigger time is fixed at construction.
#[derive(Debug, Clone)]
pub struct Routine {
    id: RoutineId,
    action_script: Vec<ActionPayload>,
    variables: Variables,
    context: Option<Context>,
    trigger_time: DateTime<Utc>,
}

impl Routine {
    pub fn new(
        id: impl Into<RoutineId>,
        action_script: Vec<ActionPayload>,
        variables: Variables,
        context: Option<Context>,
        trigger_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            action_script,
            variables,
            context,
            trigger_time,
        }
    }

    /// Build a routine from a trigger request, defaulting the trigger time
    /// to `clock.now()`.
    pub fn from_request(request: TriggerRequest, clock: &dyn Clock) -> Self {
        let trigger_time = request.trigger_time.unwrap_or_else(|| clock.now());
        Self::new(
            request.routine_id,
            request.action_script,
            request.variables,
            request.context,
            trigger_time,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn action_script(&self) -> &[ActionPayload] {
        &self.action_script
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn trigger_time(&self) -> DateTime<Utc> {
        self.trigger_time
    }
}
