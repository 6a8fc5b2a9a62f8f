// Index drift entities

use serde::{Deserialize, Serialize};

use crate::entities::container::EventRef;
use crate::value_objects::{ContainerId, EventId};

/// An event directory present in the store but absent from every index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnindexedEvent {
    pub event_id: Option<EventId>,
    pub event_name: Option<String>,
    pub tournament_name: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
    /// `None` when no indexed container owns the directory; repair has to ask the remote.
    pub container_id: Option<ContainerId>,
    pub missing_events: Vec<UnindexedEvent>,
    /// Index entries whose directory is absent. Reported, never removed.
    pub dangling_refs: Vec<EventRef>,
}

impl Drift {
    pub fn missing_event_ids(&self) -> Vec<EventId> {
        self.missing_events
            .iter()
            .filter_map(|event| event.event_id)
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.missing_events.len() + self.dangling_refs.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "entries", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Clean,
    DriftFound(usize),
    Repaired(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub outcome: ReconcileOutcome,
    pub drift: Vec<Drift>,
    /// Entries that need operator action (dangling refs, unreadable attributes, unknown owners).
    pub unrepairable: Vec<String>,
}
