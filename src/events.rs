//! Application events that leave a lasting mark on the field.
//!
//! The host appends a [`SpikeEvent`] whenever something worth acknowledging
//! happens (an invite email added, a calendar connected). The list is
//! append-only and is handed to the simulation every tick; the
//! [`EventLedger`] makes sure each id turns into exactly one spike, however
//! often it is delivered.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An externally triggered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    /// Unique id. Repeated deliveries of the same id are ignored.
    pub id: String,
    /// Free-form category for the label renderer (e.g. `"mail"`).
    pub category: String,
    /// Label text.
    pub text: String,
    /// Host timestamp, passed through untouched.
    pub timestamp: f64,
}

impl SpikeEvent {
    /// Build an event record.
    pub fn new(id: impl Into<String>, category: impl Into<String>, text: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Remembers which event ids have already been turned into spikes.
#[derive(Debug, Default, Clone)]
pub struct EventLedger {
    seen: HashSet<String>,
}

impl EventLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events from `events` whose ids have not been seen, in list order.
    ///
    /// Marks them as seen. Duplicate ids within `events` yield one entry.
    pub fn take_new(&mut self, events: &[SpikeEvent]) -> Vec<SpikeEvent> {
        let mut fresh = Vec::new();
        for event in events {
            if self.seen.insert(event.id.clone()) {
                fresh.push(event.clone());
            }
        }
        fresh
    }

    /// Whether `id` has already spawned a spike.
    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Number of distinct ids processed so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no event has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
