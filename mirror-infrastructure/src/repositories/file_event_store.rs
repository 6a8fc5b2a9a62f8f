// Event record store on the local filesystem
// Records are staged under staging/<event_id>/ and renamed into place as one directory.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use mirror_domain::{EventId, EventStore, RecordKind, RecordRead, EVENTS_DIR, STAGING_DIR};

use super::store_io::{exists, resolve_relative, to_pretty_json, write_atomic};

pub struct FileEventStore {
    root: PathBuf,
    indent: usize,
}

impl FileEventStore {
    pub fn new(root: impl Into<PathBuf>, indent: usize) -> Self {
        Self {
            root: root.into(),
            indent,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_dir(&self, event_id: EventId) -> PathBuf {
        self.root.join(STAGING_DIR).join(event_id.to_string())
    }

    fn record_path(&self, rel_path: &str, kind: RecordKind) -> Result<PathBuf> {
        Ok(resolve_relative(&self.root, rel_path)?.join(kind.file_name()))
    }
}

async fn remove_dir_if_present(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(anyhow!("failed to remove {}: {}", path.display(), err)),
    }
}

async fn holds_record(dir: &Path) -> Result<bool> {
    for kind in RecordKind::ALL {
        if exists(&dir.join(kind.file_name())).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn clear_staging(&self, event_id: EventId) -> Result<()> {
        remove_dir_if_present(&self.staging_dir(event_id)).await
    }

    async fn stage_record(&self, event_id: EventId, kind: RecordKind, value: &Value) -> Result<()> {
        let path = self.staging_dir(event_id).join(kind.file_name());
        let bytes = to_pretty_json(value, self.indent)?;
        write_atomic(&path, &bytes).await
    }

    async fn staged_kinds(&self, event_id: EventId) -> Result<Vec<RecordKind>> {
        let dir = self.staging_dir(event_id);
        let mut kinds = Vec::new();
        for kind in RecordKind::ALL {
            if exists(&dir.join(kind.file_name())).await? {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    async fn commit_staged(&self, event_id: EventId, rel_path: &str) -> Result<()> {
        let staged = self.staging_dir(event_id);
        if !exists(&staged).await? {
            return Err(anyhow!("nothing staged for event {}", event_id));
        }
        let target = resolve_relative(&self.root, rel_path)?;
        let parent = target
            .parent()
            .ok_or_else(|| anyhow!("event path '{}' has no parent", rel_path))?;
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;

        // A crash between the two renames leaves no directory at the target, never a mix.
        let displaced = if exists(&target).await? {
            let aside = self
                .root
                .join(STAGING_DIR)
                .join(format!(".replaced-{}-{}", event_id, Uuid::new_v4().simple()));
            fs::rename(&target, &aside)
                .await
                .with_context(|| format!("failed to move aside {}", target.display()))?;
            Some(aside)
        } else {
            None
        };
        fs::rename(&staged, &target)
            .await
            .with_context(|| format!("failed to commit event {} to {}", event_id, rel_path))?;
        if let Some(aside) = displaced {
            if let Err(err) = remove_dir_if_present(&aside).await {
                warn!("stale event copy left at {}: {}", aside.display(), err);
            }
        }
        debug!("committed event {} to {}", event_id, rel_path);
        Ok(())
    }

    async fn read_record(&self, rel_path: &str, kind: RecordKind) -> Result<RecordRead> {
        let path = self.record_path(rel_path, kind)?;
        if !exists(&path).await? {
            return Ok(RecordRead::Missing);
        }
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(match serde_json::from_slice(&bytes) {
            Ok(value) => RecordRead::Present(value),
            Err(err) => RecordRead::Invalid(err.to_string()),
        })
    }

    async fn write_record(&self, rel_path: &str, kind: RecordKind, value: &Value) -> Result<()> {
        let dir = resolve_relative(&self.root, rel_path)?;
        if !exists(&dir).await? {
            return Err(anyhow!("event directory {} does not exist", rel_path));
        }
        let bytes = to_pretty_json(value, self.indent)?;
        write_atomic(&dir.join(kind.file_name()), &bytes).await
    }

    async fn record_exists(&self, rel_path: &str, kind: RecordKind) -> Result<bool> {
        exists(&self.record_path(rel_path, kind)?).await
    }

    async fn event_dir_exists(&self, rel_path: &str) -> Result<bool> {
        let dir = resolve_relative(&self.root, rel_path)?;
        Ok(fs::metadata(&dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    async fn list_event_dirs(&self) -> Result<Vec<String>> {
        let events_root = self.root.join(EVENTS_DIR);
        let mut found = Vec::new();
        if !exists(&events_root).await? {
            return Ok(found);
        }
        let mut pending = vec![(events_root, EVENTS_DIR.to_string())];
        while let Some((dir, rel)) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to list {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                pending.push((entry.path(), format!("{}/{}", rel, name)));
            }
            if holds_record(&dir).await? {
                found.push(rel);
            }
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PATH: &str = "events/Japan/2023/11/14/Cup/Singles";

    async fn stage_all(store: &FileEventStore, event_id: EventId, marker: &str) {
        for kind in RecordKind::ALL {
            let record = json!({ "kind": kind.file_name(), "marker": marker });
            store
                .stage_record(event_id, kind, &record)
                .await
                .expect("stage");
        }
    }

    #[tokio::test]
    async fn commit_moves_staged_records_into_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        let event_id = EventId(999);

        stage_all(&store, event_id, "first").await;
        assert_eq!(store.staged_kinds(event_id).await.expect("kinds"), RecordKind::ALL.to_vec());
        store.commit_staged(event_id, PATH).await.expect("commit");

        assert!(store.event_dir_exists(PATH).await.expect("dir"));
        assert!(store.staged_kinds(event_id).await.expect("kinds").is_empty());
        let text = std::fs::read_to_string(dir.path().join(PATH).join("attr.json")).expect("read");
        assert_eq!(text, "{\n  \"kind\": \"attr.json\",\n  \"marker\": \"first\"\n}\n");
        assert_eq!(store.list_event_dirs().await.expect("list"), vec![PATH.to_string()]);
    }

    #[tokio::test]
    async fn recommit_replaces_the_whole_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        let event_id = EventId(999);

        stage_all(&store, event_id, "first").await;
        store.commit_staged(event_id, PATH).await.expect("commit");
        std::fs::write(dir.path().join(PATH).join("stray.txt"), "x").expect("stray");

        stage_all(&store, event_id, "second").await;
        store.commit_staged(event_id, PATH).await.expect("recommit");

        let RecordRead::Present(value) =
            store.read_record(PATH, RecordKind::Seeds).await.expect("read")
        else {
            panic!("seeds missing after recommit");
        };
        assert_eq!(value["marker"], "second");
        assert!(!dir.path().join(PATH).join("stray.txt").exists());
        let staging: Vec<_> = std::fs::read_dir(dir.path().join(STAGING_DIR))
            .expect("staging dir")
            .collect();
        assert!(staging.is_empty());
    }

    #[tokio::test]
    async fn partial_staging_is_not_visible_and_clears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        let event_id = EventId(999);
        store
            .stage_record(event_id, RecordKind::Standings, &json!({"data": []}))
            .await
            .expect("stage");

        assert!(dir.path().join("staging/999/standings.json").exists());
        assert!(store.list_event_dirs().await.expect("list").is_empty());

        store.clear_staging(event_id).await.expect("clear");
        assert!(!dir.path().join("staging/999").exists());
        store.clear_staging(event_id).await.expect("clear twice");
    }

    #[tokio::test]
    async fn read_distinguishes_missing_invalid_and_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        let event_dir = dir.path().join(PATH);
        std::fs::create_dir_all(&event_dir).expect("mkdir");
        std::fs::write(event_dir.join("attr.json"), "{ nope").expect("write");

        assert_eq!(
            store.read_record(PATH, RecordKind::Seeds).await.expect("read"),
            RecordRead::Missing
        );
        assert!(matches!(
            store.read_record(PATH, RecordKind::Attributes).await.expect("read"),
            RecordRead::Invalid(_)
        ));
        store
            .write_record(PATH, RecordKind::Attributes, &json!({"event_id": 1}))
            .await
            .expect("rewrite");
        assert!(store.record_exists(PATH, RecordKind::Attributes).await.expect("exists"));
        assert!(matches!(
            store.read_record(PATH, RecordKind::Attributes).await.expect("read"),
            RecordRead::Present(_)
        ));
    }

    #[tokio::test]
    async fn write_record_refuses_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        assert!(store
            .write_record(PATH, RecordKind::Attributes, &json!({}))
            .await
            .is_err());
        assert!(!dir.path().join(PATH).exists());
    }

    #[tokio::test]
    async fn list_skips_directories_without_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        let other = "events/Other/2020/01/01/Old/Doubles";
        std::fs::create_dir_all(dir.path().join(other)).expect("mkdir");
        std::fs::write(dir.path().join(other).join("matches.json"), "{}").expect("write");
        std::fs::create_dir_all(dir.path().join("events/Japan/empty")).expect("mkdir");

        assert_eq!(store.list_event_dirs().await.expect("list"), vec![other.to_string()]);
    }

    #[tokio::test]
    async fn commit_without_staging_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(dir.path(), 2);
        assert!(store.commit_staged(EventId(1), PATH).await.is_err());
    }
}
