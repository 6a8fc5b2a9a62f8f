// Sync run report entities

use serde::{Deserialize, Serialize};

use crate::value_objects::{ContainerId, EventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    EnumeratingContainers,
    FetchingEvent,
    Writing,
    Checkpointing,
    Reconciling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Container(ContainerId),
    Event(EventId),
    /// Container listing page that could not be fetched.
    Listing(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub entity: EntityRef,
    pub reason: String,
    /// Transient failure expected to heal on the next run.
    pub deferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOutcome {
    pub container_id: ContainerId,
    pub name: String,
    pub events_written: usize,
    /// Indexed with all four records on disk; not fetched again.
    pub events_already_complete: usize,
    pub events_skipped: usize,
    pub failures: Vec<Failure>,
    pub checkpointed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub containers_seen: usize,
    pub containers_skipped: usize,
    pub containers_synced: usize,
    pub events_written: usize,
    pub events_already_complete: usize,
    pub events_skipped: usize,
    pub new_users: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: String,
    pub phase: SyncPhase,
    pub counts: SyncCounts,
    pub containers: Vec<ContainerOutcome>,
    pub failures: Vec<Failure>,
    pub drift_entries: usize,
    pub interrupted: bool,
}

impl SyncReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            phase: SyncPhase::Idle,
            counts: SyncCounts::default(),
            containers: Vec::new(),
            failures: Vec::new(),
            drift_entries: 0,
            interrupted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRunStatus {
    Written,
    Skipped,
    AlreadySynchronized,
    Failed,
}

/// Result of fetching a single event outside its container's flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRunReport {
    pub event_id: EventId,
    pub status: EventRunStatus,
    pub path: Option<String>,
    pub reason: Option<String>,
    pub deferred: bool,
    pub new_users: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRefreshReport {
    pub known: usize,
    pub created: usize,
    pub refreshed: usize,
    pub not_found: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRefreshReport {
    pub scanned: usize,
    pub updated: usize,
    pub already_labeled: usize,
    pub unavailable: usize,
    pub unreadable: usize,
}
