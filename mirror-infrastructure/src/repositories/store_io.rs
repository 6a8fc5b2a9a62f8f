// Shared file helpers for the on-disk store
// Every rewrite goes through a temp file in the target directory followed by a rename.

use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Pretty JSON with the configured indent and a trailing newline.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<Vec<u8>> {
    let indent = " ".repeat(indent);
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?
        .to_string_lossy();
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let mut file = fs::File::create(&tmp)
        .await
        .with_context(|| format!("failed to create {}", tmp.display()))?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(anyhow!("failed to replace {}: {}", path.display(), err));
    }
    Ok(())
}

pub async fn exists(path: &Path) -> Result<bool> {
    Ok(fs::try_exists(path).await?)
}

/// Reads a JSON Lines file. A missing file is empty; blank lines are skipped.
pub async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !exists(path).await? {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line)
            .with_context(|| format!("{}:{} is not a valid record", path.display(), index + 1))?;
        out.push(item);
    }
    Ok(out)
}

pub async fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let mut out = Vec::new();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.push(b'\n');
    }
    write_atomic(path, &out).await
}

/// Joins a store-relative path onto `root`, refusing anything that could escape it.
pub fn resolve_relative(root: &Path, rel_path: &str) -> Result<PathBuf> {
    let rel = Path::new(rel_path);
    if rel_path.trim().is_empty() {
        return Err(anyhow!("empty store path"));
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(anyhow!("store path '{}' must be relative and normalized", rel_path)),
        }
    }
    Ok(root.join(rel))
}
