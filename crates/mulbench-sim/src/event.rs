//! Event system for simulation
//!
//! Pending signal writes, ordered by the time they were scheduled for.

use std::collections::VecDeque;

/// A queued signal write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    /// Time in picoseconds at which the write takes effect
    pub time: u64,
    pub signal: String,
    pub value: Vec<u8>,
}

/// Event queue for simulation
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<SimEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Add an event after every event scheduled at or before its time, so
    /// writes issued at the same time keep program order
    pub fn add_event(&mut self, event: SimEvent) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }

    /// Pop the next event if it is due at `now`
    pub fn pop_due(&mut self, now: u64) -> Option<SimEvent> {
        if self.events.front().is_some_and(|e| e.time <= now) {
            self.events.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
