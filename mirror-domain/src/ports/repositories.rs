use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{EventRef, RecordKind, TournamentRecord, UserRecord};
use crate::value_objects::{ContainerId, EventId, UserId};

/// Durable "already synchronized" sets. Presence is the only authority for skipping a fetch.
#[async_trait]
pub trait CheckpointLedger: Send + Sync {
    async fn is_synchronized(&self, container_id: ContainerId) -> anyhow::Result<bool>;
    /// Returns false when the id was already present.
    async fn mark_synchronized(&self, container_id: ContainerId) -> anyhow::Result<bool>;
    async fn is_event_synchronized(&self, event_id: EventId) -> anyhow::Result<bool>;
    async fn mark_event_synchronized(&self, event_id: EventId) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordRead {
    Missing,
    Invalid(String),
    Present(Value),
}

/// File-level access to the event store. Paths are relative to the store root.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn clear_staging(&self, event_id: EventId) -> anyhow::Result<()>;
    async fn stage_record(
        &self,
        event_id: EventId,
        kind: RecordKind,
        value: &Value,
    ) -> anyhow::Result<()>;
    async fn staged_kinds(&self, event_id: EventId) -> anyhow::Result<Vec<RecordKind>>;
    /// Replaces the event directory with the staged records in one rename.
    async fn commit_staged(&self, event_id: EventId, rel_path: &str) -> anyhow::Result<()>;
    async fn read_record(&self, rel_path: &str, kind: RecordKind) -> anyhow::Result<RecordRead>;
    /// Atomic single-file rewrite inside an existing event directory.
    async fn write_record(
        &self,
        rel_path: &str,
        kind: RecordKind,
        value: &Value,
    ) -> anyhow::Result<()>;
    async fn record_exists(&self, rel_path: &str, kind: RecordKind) -> anyhow::Result<bool>;
    async fn event_dir_exists(&self, rel_path: &str) -> anyhow::Result<bool>;
    /// Directories holding at least one record file, sorted.
    async fn list_event_dirs(&self) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
pub trait ContainerIndex: Send + Sync {
    async fn load_all(&self) -> anyhow::Result<Vec<TournamentRecord>>;
    async fn get(&self, container_id: ContainerId) -> anyhow::Result<Option<TournamentRecord>>;
    /// Creates the container when unknown. Never removes entries. Returns true on change.
    async fn upsert_event(
        &self,
        container_id: ContainerId,
        container_name: &str,
        event: EventRef,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn load_all(&self) -> anyhow::Result<BTreeMap<UserId, UserRecord>>;
    async fn save_all(&self, users: &[UserRecord]) -> anyhow::Result<()>;
}
