use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use mirror_domain::{ContainerId, ContainerIndex, EventRef, TournamentRecord, CONTAINER_INDEX_FILE};

use super::store_io::{read_jsonl, write_jsonl};

/// `tournaments.jsonl`, held in memory and rewritten sorted by container id on change.
pub struct JsonlContainerIndex {
    path: PathBuf,
    records: Mutex<BTreeMap<ContainerId, TournamentRecord>>,
}

impl JsonlContainerIndex {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let path = data_dir.as_ref().join(CONTAINER_INDEX_FILE);
        let mut records = BTreeMap::new();
        for record in read_jsonl::<TournamentRecord>(&path).await? {
            let id = record.tournament_id;
            if records.insert(id, record).is_some() {
                return Err(anyhow!(
                    "{} lists container {} twice",
                    path.display(),
                    id
                ));
            }
        }
        debug!("container index loaded: {} containers", records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }
}

#[async_trait]
impl ContainerIndex for JsonlContainerIndex {
    async fn load_all(&self) -> Result<Vec<TournamentRecord>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn get(&self, container_id: ContainerId) -> Result<Option<TournamentRecord>> {
        Ok(self.records.lock().await.get(&container_id).cloned())
    }

    async fn upsert_event(
        &self,
        container_id: ContainerId,
        container_name: &str,
        event: EventRef,
    ) -> Result<bool> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(container_id)
            .or_insert_with(|| TournamentRecord::new(container_id, container_name));
        let mut changed = record.events.is_empty() && record.name != container_name;
        if changed {
            record.name = container_name.to_string();
        }
        changed |= record.upsert_event(event);
        if !changed {
            return Ok(false);
        }
        let snapshot: Vec<&TournamentRecord> = records.values().collect();
        write_jsonl(&self.path, &snapshot).await?;
        Ok(true)
    }
}
