use async_trait::async_trait;

use crate::value_objects::{EventId, EventLabels};

/// Best-effort external classification. `None` means unavailable.
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    async fn classify(
        &self,
        tournament_name: &str,
        event_name: &str,
        event_id: EventId,
    ) -> Option<EventLabels>;
}
