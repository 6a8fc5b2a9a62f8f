use std::collections::BTreeSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use mirror_domain::{
    CheckpointLedger, ContainerId, EventId, CONTAINER_LEDGER_FILE, EVENT_LEDGER_FILE,
};

#[derive(Default)]
struct LedgerState {
    containers: BTreeSet<ContainerId>,
    events: BTreeSet<EventId>,
}

/// `done.csv` / `done_events.csv`: one id per line, appended and fsynced on mark.
pub struct FileCheckpointLedger {
    containers_path: PathBuf,
    events_path: PathBuf,
    state: Mutex<LedgerState>,
}

impl FileCheckpointLedger {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let containers_path = data_dir.join(CONTAINER_LEDGER_FILE);
        let events_path = data_dir.join(EVENT_LEDGER_FILE);
        let state = LedgerState {
            containers: load_ids(&containers_path).await?,
            events: load_ids(&events_path).await?,
        };
        debug!(
            "ledger loaded: {} containers, {} events",
            state.containers.len(),
            state.events.len()
        );
        Ok(Self {
            containers_path,
            events_path,
            state: Mutex::new(state),
        })
    }
}

async fn load_ids<T: FromStr + Ord>(path: &Path) -> Result<BTreeSet<T>> {
    if !fs::try_exists(path).await? {
        return Ok(BTreeSet::new());
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut ids = BTreeSet::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<T>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => warn!("{}:{} ignored: '{}'", path.display(), index + 1, line),
        }
    }
    Ok(ids)
}

/// A crash mid-append can leave the last line unterminated.
async fn ends_without_newline(file: &mut fs::File) -> Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

async fn append_id(path: &Path, id: u64) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let line = if ends_without_newline(&mut file).await? {
        warn!("{} ends with a partial line, terminating it", path.display());
        format!("\n{}\n", id)
    } else {
        format!("{}\n", id)
    };
    file.write_all(line.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl CheckpointLedger for FileCheckpointLedger {
    async fn is_synchronized(&self, container_id: ContainerId) -> Result<bool> {
        Ok(self.state.lock().await.containers.contains(&container_id))
    }

    async fn mark_synchronized(&self, container_id: ContainerId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.containers.contains(&container_id) {
            return Ok(false);
        }
        append_id(&self.containers_path, container_id.get()).await?;
        state.containers.insert(container_id);
        Ok(true)
    }

    async fn is_event_synchronized(&self, event_id: EventId) -> Result<bool> {
        Ok(self.state.lock().await.events.contains(&event_id))
    }

    async fn mark_event_synchronized(&self, event_id: EventId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.events.contains(&event_id) {
            return Ok(false);
        }
        append_id(&self.events_path, event_id.get()).await?;
        state.events.insert(event_id);
        Ok(true)
    }
}
