use std::sync::Arc;

use mirror_domain::ports::{
    CheckpointLedger, ContainerIndex, EventStore, LabelClassifier, RemoteSource, UserRepository,
};
use mirror_domain::RuntimeConfig;

use crate::fetch::RetryExecutor;
use crate::SyncMetrics;

#[derive(Clone)]
pub struct SyncState {
    pub config: RuntimeConfig,
    pub remote: Arc<dyn RemoteSource>,
    pub ledger: Arc<dyn CheckpointLedger>,
    pub store: Arc<dyn EventStore>,
    pub index: Arc<dyn ContainerIndex>,
    pub users: Arc<dyn UserRepository>,
    pub classifier: Arc<dyn LabelClassifier>,
    pub executor: RetryExecutor,
    pub metrics: Arc<SyncMetrics>,
}

pub struct SyncPorts {
    pub remote: Arc<dyn RemoteSource>,
    pub ledger: Arc<dyn CheckpointLedger>,
    pub store: Arc<dyn EventStore>,
    pub index: Arc<dyn ContainerIndex>,
    pub users: Arc<dyn UserRepository>,
    pub classifier: Arc<dyn LabelClassifier>,
}

impl SyncState {
    pub fn new(config: RuntimeConfig, ports: SyncPorts) -> Self {
        let metrics = Arc::new(SyncMetrics::default());
        let executor = RetryExecutor::new(config.retry).with_metrics(metrics.clone());
        Self {
            config,
            remote: ports.remote,
            ledger: ports.ledger,
            store: ports.store,
            index: ports.index,
            users: ports.users,
            classifier: ports.classifier,
            executor,
            metrics,
        }
    }
}
