// Container (tournament) index entity
// One line of tournaments.jsonl

use serde::{Deserialize, Serialize};

use crate::value_objects::{ContainerId, EventId};

pub const RECORD_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub event_id: EventId,
    #[serde(default)]
    pub event_name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub tournament_id: ContainerId,
    pub name: String,
    #[serde(default)]
    pub events: Vec<EventRef>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    RECORD_VERSION.to_string()
}

impl TournamentRecord {
    pub fn new(tournament_id: ContainerId, name: impl Into<String>) -> Self {
        Self {
            tournament_id,
            name: name.into(),
            events: Vec::new(),
            version: default_version(),
        }
    }

    pub fn find_event(&self, event_id: EventId) -> Option<&EventRef> {
        self.events.iter().find(|event| event.event_id == event_id)
    }

    /// Appends the reference, or updates the entry with the same event id or path.
    /// Never removes entries. Returns true when the record changed.
    pub fn upsert_event(&mut self, event: EventRef) -> bool {
        if let Some(existing) = self
            .events
            .iter_mut()
            .find(|candidate| candidate.event_id == event.event_id || candidate.path == event.path)
        {
            if *existing == event {
                return false;
            }
            *existing = event;
            return true;
        }
        self.events.push(event);
        true
    }
}
