use anyhow::{anyhow, Context};
use mirror_domain::{
    ContainerId, EventAttributes, EventId, EventLabels, EventRef, RecordKind, RecordRead,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::SyncState;

/// Writes event records through the staging area and registers committed events in the index.
pub struct EventWriter<'a> {
    state: &'a SyncState,
}

impl<'a> EventWriter<'a> {
    pub fn new(state: &'a SyncState) -> Self {
        Self { state }
    }

    /// Drops anything left behind by an interrupted attempt.
    pub async fn prepare(&self, event_id: EventId) -> anyhow::Result<()> {
        self.state.store.clear_staging(event_id).await
    }

    pub async fn stage<T: Serialize>(
        &self,
        event_id: EventId,
        kind: RecordKind,
        record: &T,
    ) -> anyhow::Result<()> {
        let value = serde_json::to_value(record).with_context(|| {
            format!("failed to encode {} for event {}", kind.file_name(), event_id)
        })?;
        self.state.store.stage_record(event_id, kind, &value).await?;
        debug!("staged {} for event {}", kind.file_name(), event_id);
        Ok(())
    }

    /// Attributes already committed at `rel_path`, if readable.
    pub async fn existing_attributes(
        &self,
        rel_path: &str,
    ) -> anyhow::Result<Option<EventAttributes>> {
        match self.state.store.read_record(rel_path, RecordKind::Attributes).await? {
            RecordRead::Present(value) => match serde_json::from_value::<EventAttributes>(value) {
                Ok(existing) => Ok(Some(existing)),
                Err(err) => {
                    warn!("ignoring unreadable attributes at {}: {}", rel_path, err);
                    Ok(None)
                }
            },
            RecordRead::Invalid(err) => {
                warn!("ignoring invalid attributes at {}: {}", rel_path, err);
                Ok(None)
            }
            RecordRead::Missing => Ok(None),
        }
    }

    /// Moves the four staged records into place, then records the event in its container.
    pub async fn commit(
        &self,
        container_id: ContainerId,
        container_name: &str,
        event_ref: EventRef,
    ) -> anyhow::Result<bool> {
        let event_id = event_ref.event_id;
        let staged = self.state.store.staged_kinds(event_id).await?;
        let missing: Vec<&str> = RecordKind::ALL
            .iter()
            .filter(|kind| !staged.contains(kind))
            .map(RecordKind::file_name)
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "event {} is incomplete, missing {}",
                event_id,
                missing.join(", ")
            ));
        }

        self.state
            .store
            .commit_staged(event_id, &event_ref.path)
            .await
            .with_context(|| format!("failed to commit event {} to {}", event_id, event_ref.path))?;
        let changed = self
            .state
            .index
            .upsert_event(container_id, container_name, event_ref)
            .await?;
        self.state.metrics.record_event_written();
        Ok(changed)
    }

    /// Rewrites only the labels of a committed attributes record.
    pub async fn refresh_labels(
        &self,
        rel_path: &str,
        mut attributes: EventAttributes,
        labels: EventLabels,
    ) -> anyhow::Result<()> {
        attributes.labels = Some(labels);
        let value = serde_json::to_value(&attributes)?;
        self.state
            .store
            .write_record(rel_path, RecordKind::Attributes, &value)
            .await
    }
}
