// src/queue/device.rs

use std::collections::{HashMap, VecDeque};

use crate::model::{DeviceId, SubroutineId};

/// Ordered line of subroutines dispatched to one device.
///
/// The head is the subroutine currently active on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQueue {
    entries: VecDeque<SubroutineId>,
}

impl DeviceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|s| s.as_str())
    }

    pub fn front(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn push_back(&mut self, id: SubroutineId) {
        self.entries.push_back(id);
    }

    /// Insert at `index`, clamped to the end of the line.
    pub fn insert(&mut self, index: usize, id: SubroutineId) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, id);
    }

    pub fn remove(&mut self, index: usize) -> Option<SubroutineId> {
        self.entries.remove(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|s| s == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|s| s.as_str())
    }
}

/// Active tier: one [`DeviceQueue`] per registered device.
#[derive(Debug, Default)]
pub struct ActiveQueues {
    queues: HashMap<DeviceId, DeviceQueue>,
}

impl ActiveQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an empty queue for `device`, returning the queue it replaced.
    pub fn create(&mut self, device: impl Into<DeviceId>) -> Option<DeviceQueue> {
        self.queues.insert(device.into(), DeviceQueue::new())
    }

    /// Remove the queue for `device`. `None` if it was not registered.
    pub fn remove(&mut self, device: &str) -> Option<DeviceQueue> {
        self.queues.remove(device)
    }

    pub fn get(&self, device: &str) -> Option<&DeviceQueue> {
        self.queues.get(device)
    }

    pub fn get_mut(&mut self, device: &str) -> Option<&mut DeviceQueue> {
        self.queues.get_mut(device)
    }

    pub fn contains(&self, device: &str) -> bool {
        self.queues.contains_key(device)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceQueue)> + '_ {
        self.queues.iter().map(|(d, q)| (d.as_str(), q))
    }
}
