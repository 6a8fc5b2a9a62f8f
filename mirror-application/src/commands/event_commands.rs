use futures_util::future::join4;
use mirror_domain::{
    build_attributes, build_matches, build_seeds, build_standings, event_path_for_timestamp,
    event_region, event_timestamp, EntrantDirectory, EventAttributes, EventId, EventRef,
    EventRunReport, EventRunStatus, RecordKind, UserRecord,
};
use tracing::{debug, info, warn};

use crate::commands::{absorb_profiles, EventWriter};
use crate::fetch::remote_calls::{fetch_event_details, fetch_seeds, fetch_sets, fetch_standings};
use crate::{AppError, SyncError, SyncState};

pub enum EventOutcome {
    Written {
        event_id: EventId,
        path: String,
        profiles: Vec<UserRecord>,
    },
    Skipped {
        event_id: EventId,
        reason: String,
    },
    Failed {
        event_id: EventId,
        error: SyncError,
    },
}

/// Fetches the four sub-records of one event and commits them together.
pub async fn fetch_and_write_event(state: &SyncState, event_id: EventId) -> EventOutcome {
    match write_event(state, event_id).await {
        Ok(outcome) => outcome,
        Err(error) => {
            state.metrics.record_event_failed();
            warn!("event {} failed: {}", event_id, error);
            EventOutcome::Failed { event_id, error }
        }
    }
}

async fn write_event(state: &SyncState, event_id: EventId) -> Result<EventOutcome, SyncError> {
    let writer = EventWriter::new(state);
    writer.prepare(event_id).await?;

    let (details, standings, seeds, sets) = join4(
        fetch_event_details(state, event_id),
        fetch_standings(state, event_id),
        fetch_seeds(state, event_id),
        fetch_sets(state, event_id),
    )
    .await;

    // Seeds and matches resolve entrants through what standings saw first.
    let mut directory = EntrantDirectory::new();
    let (standings, num_entrants) = build_standings(&standings?, &mut directory);
    writer.stage(event_id, RecordKind::Standings, &standings).await?;

    let seed_nodes = match seeds {
        Ok(nodes) => nodes,
        Err(SyncError::NoPhase(_)) => {
            writer.prepare(event_id).await?;
            info!("event {} has no phase, skipping", event_id);
            return Ok(EventOutcome::Skipped {
                event_id,
                reason: "event has no phase".to_string(),
            });
        }
        Err(err) => return Err(err),
    };
    let seeds = build_seeds(&seed_nodes, &mut directory);
    writer.stage(event_id, RecordKind::Seeds, &seeds).await?;

    let matches = build_matches(&sets?, &directory);
    writer.stage(event_id, RecordKind::Matches, &matches).await?;

    let details = details?;
    let labels = state
        .classifier
        .classify(&details.tournament.name, &details.name, event_id)
        .await;
    if labels.is_none() {
        debug!("labels unavailable for event {}", event_id);
    }

    let path = event_path_for_timestamp(
        event_region(&details),
        event_timestamp(&details),
        &details.tournament.name,
        &details.name,
    );
    let incoming = build_attributes(&details, num_entrants, labels);
    let attributes = match writer.existing_attributes(&path).await? {
        Some(existing) if existing.event_id != event_id => {
            return Err(SyncError::PathCollision {
                path,
                owner: existing.event_id,
            });
        }
        Some(existing) => EventAttributes::merged_with_existing(incoming, &existing),
        None => incoming,
    };
    writer.stage(event_id, RecordKind::Attributes, &attributes).await?;

    let event_ref = EventRef {
        event_id,
        event_name: details.name.clone(),
        path: path.clone(),
    };
    writer
        .commit(details.tournament.id, &details.tournament.name, event_ref)
        .await?;
    info!("event {} written to {}", event_id, path);

    Ok(EventOutcome::Written {
        event_id,
        path,
        profiles: directory.into_profiles(),
    })
}

/// Fetches one event outside its container's flow and records it in the event ledger.
pub async fn sync_single_event(
    state: &SyncState,
    event_id: EventId,
    force: bool,
) -> Result<EventRunReport, AppError> {
    let mut report = EventRunReport {
        event_id,
        status: EventRunStatus::AlreadySynchronized,
        path: None,
        reason: None,
        deferred: false,
        new_users: 0,
    };
    if !force && state.ledger.is_event_synchronized(event_id).await? {
        info!("event {} already synchronized", event_id);
        return Ok(report);
    }

    match fetch_and_write_event(state, event_id).await {
        EventOutcome::Written { path, profiles, .. } => {
            state.ledger.mark_event_synchronized(event_id).await?;
            report.new_users = absorb_profiles(state, profiles).await?;
            report.status = EventRunStatus::Written;
            report.path = Some(path);
        }
        EventOutcome::Skipped { reason, .. } => {
            report.status = EventRunStatus::Skipped;
            report.reason = Some(reason);
        }
        EventOutcome::Failed { error, .. } => {
            report.status = EventRunStatus::Failed;
            report.deferred = error.is_deferred();
            report.reason = Some(error.to_string());
        }
    }
    Ok(report)
}
