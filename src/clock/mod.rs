// src/clock/mod.rs

use std::fmt::Debug;

use chrono::{DateTime, Utc};

pub mod mock;

/// Abstract time source supplied by the host.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Implementation that reads the wall clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
