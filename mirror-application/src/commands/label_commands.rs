use mirror_domain::{EventAttributes, LabelRefreshReport, RecordKind, RecordRead};
use tracing::{debug, info, warn};

use crate::commands::EventWriter;
use crate::{AppError, SyncState};

/// Fills in labels for committed events. Unavailable classifications leave records untouched.
pub async fn enrich_labels(state: &SyncState, force: bool) -> Result<LabelRefreshReport, AppError> {
    let writer = EventWriter::new(state);
    let mut report = LabelRefreshReport::default();

    for dir in state.store.list_event_dirs().await? {
        let attributes = match state.store.read_record(&dir, RecordKind::Attributes).await? {
            RecordRead::Present(value) => serde_json::from_value::<EventAttributes>(value).ok(),
            RecordRead::Missing => continue,
            RecordRead::Invalid(_) => None,
        };
        report.scanned += 1;
        let Some(attributes) = attributes else {
            warn!("skipping {}: attributes unreadable", dir);
            report.unreadable += 1;
            continue;
        };
        if attributes.labels.is_some() && !force {
            report.already_labeled += 1;
            continue;
        }

        let labels = state
            .classifier
            .classify(
                &attributes.tournament_name,
                &attributes.event_name,
                attributes.event_id,
            )
            .await;
        match labels {
            Some(labels) => {
                writer.refresh_labels(&dir, attributes, labels).await?;
                report.updated += 1;
            }
            None => {
                debug!("labels unavailable for {}", dir);
                report.unavailable += 1;
            }
        }
    }

    info!(
        "label enrichment: scanned={} updated={} unavailable={} unreadable={}",
        report.scanned, report.updated, report.unavailable, report.unreadable
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use mirror_domain::{EventId, EventLabels, EventType, GameRule, RegistrationType};

    use super::*;
    use crate::commands::sync_single_event;
    use crate::testing::{fixture_path, harness, script_event};

    fn labels(event_type: EventType) -> EventLabels {
        EventLabels {
            registration_type: RegistrationType::Open,
            event_type,
            game_rule: GameRule::Standard,
        }
    }

    fn stored_labels(h: &crate::testing::Harness, path: &str) -> Option<EventLabels> {
        let value = h.store.record(path, RecordKind::Attributes).expect("attr");
        serde_json::from_value::<EventAttributes>(value)
            .expect("decode")
            .labels
    }

    #[tokio::test(start_paused = true)]
    async fn fills_missing_labels_only() {
        let h = harness();
        script_event(&h.remote, 12345, "Cup", 999, "Singles");
        sync_single_event(&h.state, EventId(999), false)
            .await
            .expect("sync");
        let path = fixture_path("Cup", "Singles");
        assert_eq!(stored_labels(&h, &path), None);

        h.classifier.set(Some(labels(EventType::Singles)));
        let report = enrich_labels(&h.state, false).await.expect("enrich");
        assert_eq!(report.updated, 1);
        assert_eq!(stored_labels(&h, &path), Some(labels(EventType::Singles)));

        h.classifier.set(Some(labels(EventType::Side)));
        let report = enrich_labels(&h.state, false).await.expect("enrich again");
        assert_eq!(report.already_labeled, 1);
        assert_eq!(stored_labels(&h, &path), Some(labels(EventType::Singles)));

        let report = enrich_labels(&h.state, true).await.expect("forced");
        assert_eq!(report.updated, 1);
        assert_eq!(stored_labels(&h, &path), Some(labels(EventType::Side)));
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_classifier_changes_nothing() {
        let h = harness();
        script_event(&h.remote, 12345, "Cup", 999, "Singles");
        sync_single_event(&h.state, EventId(999), false)
            .await
            .expect("sync");
        let before = h.store.snapshot();

        let report = enrich_labels(&h.state, true).await.expect("enrich");

        assert_eq!(report.unavailable, 1);
        assert_eq!(h.store.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_without_labels_keeps_enriched_ones() {
        let h = harness();
        script_event(&h.remote, 12345, "Cup", 999, "Singles");
        sync_single_event(&h.state, EventId(999), false)
            .await
            .expect("sync");
        h.classifier.set(Some(labels(EventType::Doubles)));
        enrich_labels(&h.state, false).await.expect("enrich");

        h.classifier.set(None);
        sync_single_event(&h.state, EventId(999), true)
            .await
            .expect("refetch");

        let path = fixture_path("Cup", "Singles");
        assert_eq!(stored_labels(&h, &path), Some(labels(EventType::Doubles)));
    }
}
