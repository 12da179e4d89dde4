// src/queue/mod.rs

//! The two scheduler tiers.
//!
//! - [`ready`] holds subroutines waiting for their start time, keyed by
//!   timestamp.
//! - [`device`] holds, per target device, the ordered line of subroutines
//!   dispatched to that device.

pub mod device;
pub mod ready;

pub use device::{ActiveQueues, DeviceQueue};
pub use ready::ReadyQueue;
