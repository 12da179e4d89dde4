// src/model/mod.rs

//! Entity model: routines, subroutines and actions.
//!
//! These are plain values. Back-references (`Action::routine`,
//! `Subroutine::routine`) are ids into the scheduler's arenas, never owning
//! pointers, so cancelling a routine cannot leave a dangling borrow behind.

pub mod action;
pub mod id;
pub mod routine;
pub mod subroutine;

pub use action::{Action, ActionPayload};
pub use id::{derive_child_id, generate_random_id};
pub use routine::{Context, Routine, TriggerRequest, Variables};
pub use subroutine::Subroutine;

/// Caller-supplied routine identifier, unique per trigger.
pub type RoutineId = String;

/// Subroutine identifier, `<routine id>-<suffix>` unless given explicitly.
pub type SubroutineId = String;

/// Action identifier, `<subroutine id>-<position>` unless given explicitly.
pub type ActionId = String;

/// Target device (entity) identifier.
pub type DeviceId = String;
