// src/queue/ready.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::SubroutineId;

/// Ready tier: subroutines keyed by scheduled start time.
///
/// Several subroutines may share a timestamp (two routines triggered in the
/// same instant, for example). Such collisions are kept in one bucket in
/// insertion order instead of overwriting each other, so iteration always
/// observes every entry: earliest key first, bucket order within a key.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    slots: BTreeMap<DateTime<Utc>, Vec<SubroutineId>>,
    len: usize,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued subroutines (not distinct timestamps).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct timestamp keys.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Queue `id` at `at`.
    ///
    /// Returns `true` if the timestamp was already occupied, i.e. the entry
    /// collided and was appended behind the existing ones.
    pub fn insert(&mut self, at: DateTime<Utc>, id: SubroutineId) -> bool {
        let bucket = self.slots.entry(at).or_default();
        let collided = !bucket.is_empty();
        if collided {
            debug!(subroutine = %id, %at, bucket = bucket.len(), "ready timestamp collision; appending to bucket");
        }
        bucket.push(id);
        self.len += 1;
        collided
    }

    /// Remove `id` from the bucket at `at`. Returns `false` if it was not
    /// queued there.
    pub fn remove(&mut self, at: DateTime<Utc>, id: &str) -> bool {
        let Some(bucket) = self.slots.get_mut(&at) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|s| s == id) else {
            return false;
        };

        bucket.remove(pos);
        if bucket.is_empty() {
            self.slots.remove(&at);
        }
        self.len -= 1;
        true
    }

    /// All entries whose start time is at or before `now`, in queue order.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<(DateTime<Utc>, SubroutineId)> {
        self.slots
            .range(..=now)
            .flat_map(|(at, bucket)| bucket.iter().map(move |id| (*at, id.clone())))
            .collect()
    }

    /// Earliest start time strictly after `now`, if any.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        use std::ops::Bound::{Excluded, Unbounded};

        self.slots
            .range((Excluded(now), Unbounded))
            .next()
            .map(|(at, _)| *at)
    }

    /// Iterate every entry in queue order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &str)> + '_ {
        self.slots
            .iter()
            .flat_map(|(at, bucket)| bucket.iter().map(move |id| (*at, id.as_str())))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|(_, s)| s == id)
    }
}
