use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SyncMetrics {
    remote_requests: AtomicU64,
    remote_retries: AtomicU64,
    rate_limited: AtomicU64,
    events_written: AtomicU64,
    events_failed: AtomicU64,
    containers_checkpointed: AtomicU64,
}

impl SyncMetrics {
    pub fn record_request(&self) {
        self.remote_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self, rate_limited: bool) {
        self.remote_retries.fetch_add(1, Ordering::Relaxed);
        if rate_limited {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_event_written(&self) {
        self.events_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkpoint(&self) {
        self.containers_checkpointed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remote_requests(&self) -> u64 {
        self.remote_requests.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let requests = self.remote_requests.load(Ordering::Relaxed);
        let retries = self.remote_retries.load(Ordering::Relaxed);
        let rate_limited = self.rate_limited.load(Ordering::Relaxed);
        let written = self.events_written.load(Ordering::Relaxed);
        let failed = self.events_failed.load(Ordering::Relaxed);
        let checkpointed = self.containers_checkpointed.load(Ordering::Relaxed);

        format!(
            "# TYPE mirror_remote_requests_total counter\n\
mirror_remote_requests_total {}\n\
# TYPE mirror_remote_retries_total counter\n\
mirror_remote_retries_total {}\n\
# TYPE mirror_rate_limited_total counter\n\
mirror_rate_limited_total {}\n\
# TYPE mirror_events_written_total counter\n\
mirror_events_written_total {}\n\
# TYPE mirror_events_failed_total counter\n\
mirror_events_failed_total {}\n\
# TYPE mirror_containers_checkpointed_total counter\n\
mirror_containers_checkpointed_total {}\n",
            requests, retries, rate_limited, written, failed, checkpointed
        )
    }
}
