use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use mirror_domain::{UserId, UserRecord, UserRepository, USERS_FILE};

use super::store_io::{read_jsonl, write_jsonl};

pub struct JsonlUserRepository {
    path: PathBuf,
}

impl JsonlUserRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(USERS_FILE),
        }
    }
}

#[async_trait]
impl UserRepository for JsonlUserRepository {
    async fn load_all(&self) -> Result<BTreeMap<UserId, UserRecord>> {
        let mut users = BTreeMap::new();
        for user in read_jsonl::<UserRecord>(&self.path).await? {
            if let Some(previous) = users.insert(user.user_id, user) {
                warn!("users file repeats user {}, keeping the later line", previous.user_id);
            }
        }
        Ok(users)
    }

    async fn save_all(&self, users: &[UserRecord]) -> Result<()> {
        let mut sorted: Vec<&UserRecord> = users.iter().collect();
        sorted.sort_by_key(|user| user.user_id);
        sorted.dedup_by_key(|user| user.user_id);
        write_jsonl(&self.path, &sorted).await?;
        debug!("saved {} users", sorted.len());
        Ok(())
    }
}
