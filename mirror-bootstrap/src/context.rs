use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use mirror_application::state::SyncPorts;
use mirror_application::SyncState;
use mirror_domain::{LabelClassifier, Page, QueryKind, RemoteError, RemoteSource, Variables};
use mirror_infrastructure::{
    AppConfig, FileCheckpointLedger, FileEventStore, GraphQlRemote, HttpLabelClassifier,
    JsonlContainerIndex, JsonlUserRepository, UnavailableClassifier,
};

/// Stands in for the remote service when no token is configured. Every call is a fatal 401.
struct OfflineRemote;

fn offline() -> RemoteError {
    RemoteError::http(401, None, "remote access disabled: no api_token configured")
}

#[async_trait]
impl RemoteSource for OfflineRemote {
    async fn fetch_page(
        &self,
        _: QueryKind,
        _: &Variables,
        _: u32,
        _: u32,
    ) -> Result<Page, RemoteError> {
        Err(offline())
    }

    async fn fetch_one(&self, _: QueryKind, _: &Variables) -> Result<Value, RemoteError> {
        Err(offline())
    }
}

pub struct AppContext {
    pub config: AppConfig,
    pub state: SyncState,
}

impl AppContext {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let remote: Arc<dyn RemoteSource> = match config.api_token.as_deref() {
            Some(token) => Arc::new(GraphQlRemote::new(
                config.api_url.clone(),
                token,
                Duration::from_secs(config.request_timeout_seconds),
            )?),
            None => Arc::new(OfflineRemote),
        };
        Self::with_remote(config, remote).await
    }

    /// Wires the file-backed stores under `data_dir` around the given remote.
    pub async fn with_remote(config: AppConfig, remote: Arc<dyn RemoteSource>) -> Result<Self> {
        let runtime_config = config.to_runtime_config()?;
        let data_dir = runtime_config.data_dir.clone();

        let ledger = Arc::new(FileCheckpointLedger::open(&data_dir).await?);
        let store = Arc::new(FileEventStore::new(&data_dir, runtime_config.json_indent));
        let index = Arc::new(JsonlContainerIndex::open(&data_dir).await?);
        let users = Arc::new(JsonlUserRepository::new(&data_dir));
        let classifier: Arc<dyn LabelClassifier> = match config.classifier_url.as_deref() {
            Some(url) => Arc::new(HttpLabelClassifier::new(
                url,
                config.classifier_token.clone(),
                Duration::from_secs(config.request_timeout_seconds),
            )?),
            None => Arc::new(UnavailableClassifier),
        };
        info!(
            "store at {} (game {}, {} workers)",
            data_dir, runtime_config.game_id, runtime_config.worker_count
        );

        let state = SyncState::new(
            runtime_config,
            SyncPorts {
                remote,
                ledger,
                store,
                index,
                users,
                classifier,
            },
        );
        Ok(Self { config, state })
    }
}
