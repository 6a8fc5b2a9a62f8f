use std::collections::{BTreeMap, BTreeSet};

use mirror_domain::{
    container_dir_of, ContainerId, Drift, EventId, EventOwnerNode, EventRef, ReconcileOutcome,
    ReconcileReport, RecordKind, RecordRead, UnindexedEvent,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::fetch::remote_calls::fetch_event_owner;
use crate::{AppError, SyncState};

fn drift_for(
    map: &mut BTreeMap<Option<ContainerId>, Drift>,
    container_id: Option<ContainerId>,
) -> &mut Drift {
    map.entry(container_id).or_insert_with(|| Drift {
        container_id,
        missing_events: Vec::new(),
        dangling_refs: Vec::new(),
    })
}

async fn describe_unindexed(state: &SyncState, dir: &str) -> anyhow::Result<UnindexedEvent> {
    let mut event = UnindexedEvent {
        event_id: None,
        event_name: None,
        tournament_name: None,
        path: dir.to_string(),
    };
    let attributes = state.store.read_record(dir, RecordKind::Attributes).await?;
    if let RecordRead::Present(attributes) = attributes {
        let text = |key: &str| attributes.get(key).and_then(Value::as_str).map(str::to_string);
        event.event_id = attributes.get("event_id").and_then(Value::as_u64).map(EventId);
        event.event_name = text("event_name");
        event.tournament_name = text("tournament_name");
    }
    Ok(event)
}

/// Compares the container index with the event directories on disk.
pub async fn find_drift(state: &SyncState) -> Result<Vec<Drift>, AppError> {
    let index = state.index.load_all().await?;
    let dirs = state.store.list_event_dirs().await?;

    let mut drift: BTreeMap<Option<ContainerId>, Drift> = BTreeMap::new();
    let mut indexed_paths: BTreeSet<&str> = BTreeSet::new();
    let mut owner_of_dir: BTreeMap<&str, ContainerId> = BTreeMap::new();
    for record in &index {
        for event in &record.events {
            indexed_paths.insert(event.path.as_str());
            if let Some(parent) = container_dir_of(&event.path) {
                owner_of_dir.entry(parent).or_insert(record.tournament_id);
            }
            if !state.store.event_dir_exists(&event.path).await? {
                drift_for(&mut drift, Some(record.tournament_id))
                    .dangling_refs
                    .push(event.clone());
            }
        }
    }

    for dir in &dirs {
        if indexed_paths.contains(dir.as_str()) {
            continue;
        }
        let unindexed = describe_unindexed(state, dir).await?;
        let owner = container_dir_of(dir).and_then(|parent| owner_of_dir.get(parent).copied());
        drift_for(&mut drift, owner).missing_events.push(unindexed);
    }

    Ok(drift
        .into_values()
        .filter(|entry| entry.entry_count() > 0)
        .collect())
}

async fn repair_missing(
    state: &SyncState,
    owner: Option<ContainerId>,
    missing: &UnindexedEvent,
    indexed: &BTreeMap<EventId, String>,
) -> Result<ContainerId, String> {
    let Some(event_id) = missing.event_id else {
        return Err(format!(
            "{}: attributes unreadable, event cannot be identified",
            missing.path
        ));
    };
    if let Some(existing) = indexed.get(&event_id) {
        return Err(format!(
            "{}: event {} is already indexed at {}",
            missing.path, event_id, existing
        ));
    }

    let lookup = match fetch_event_owner(state, event_id).await {
        Ok(Some(EventOwnerNode {
            tournament: Some(tournament),
            ..
        })) => Ok(tournament),
        Ok(_) => Err(format!("remote reports no owner for event {}", event_id)),
        Err(err) => Err(format!("owner lookup for event {} failed: {}", event_id, err)),
    };
    let (container_id, container_name) = match (lookup, owner) {
        (Ok(tournament), _) => {
            let name = tournament
                .name
                .or_else(|| missing.tournament_name.clone())
                .unwrap_or_else(|| format!("Tournament {}", tournament.id));
            (tournament.id, name)
        }
        // Sibling directories already indexed under one container.
        (Err(reason), Some(container_id)) => {
            warn!("{}: {}, using sibling container {}", missing.path, reason, container_id);
            let record = state
                .index
                .get(container_id)
                .await
                .map_err(|err| format!("{}: {}", missing.path, err))?;
            let name = record.map(|record| record.name).unwrap_or_default();
            (container_id, name)
        }
        (Err(reason), None) => return Err(format!("{}: {}", missing.path, reason)),
    };

    let event_ref = EventRef {
        event_id,
        event_name: missing.event_name.clone().unwrap_or_default(),
        path: missing.path.clone(),
    };
    state
        .index
        .upsert_event(container_id, &container_name, event_ref)
        .await
        .map_err(|err| format!("{}: {}", missing.path, err))?;
    Ok(container_id)
}

/// Reports drift; with `apply`, appends the missing references. Index entries are never removed.
pub async fn reconcile(state: &SyncState, apply: bool) -> Result<ReconcileReport, AppError> {
    let drift = find_drift(state).await?;
    let total: usize = drift.iter().map(Drift::entry_count).sum();

    let mut unrepairable = Vec::new();
    for entry in &drift {
        for dangling in &entry.dangling_refs {
            let reason = format!(
                "{}: event {} is indexed but its directory is absent",
                dangling.path, dangling.event_id
            );
            warn!("operator action required: {}", reason);
            unrepairable.push(reason);
        }
    }

    if total == 0 {
        info!("index and store agree");
        return Ok(ReconcileReport {
            outcome: ReconcileOutcome::Clean,
            drift,
            unrepairable,
        });
    }

    if !apply {
        warn!("found {} drift entries; rerun with --apply to repair", total);
        return Ok(ReconcileReport {
            outcome: ReconcileOutcome::DriftFound(total),
            drift,
            unrepairable,
        });
    }

    let mut indexed: BTreeMap<EventId, String> = state
        .index
        .load_all()
        .await?
        .into_iter()
        .flat_map(|record| record.events)
        .map(|event| (event.event_id, event.path))
        .collect();

    let mut repaired = 0;
    for entry in &drift {
        for missing in &entry.missing_events {
            match repair_missing(state, entry.container_id, missing, &indexed).await {
                Ok(container_id) => {
                    info!("indexed {} under container {}", missing.path, container_id);
                    if let Some(event_id) = missing.event_id {
                        indexed.insert(event_id, missing.path.clone());
                    }
                    repaired += 1;
                }
                Err(reason) => {
                    warn!("cannot repair {}", reason);
                    unrepairable.push(reason);
                }
            }
        }
    }
    Ok(ReconcileReport {
        outcome: ReconcileOutcome::Repaired(repaired),
        drift,
        unrepairable,
    })
}
