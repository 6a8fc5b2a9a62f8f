// Read-only store traversal. Nothing here writes; repair belongs to the reconciler and writer.

use std::collections::{BTreeMap, BTreeSet};

use mirror_domain::{
    analyze_placements, duplicate_seeds, match_user_refs, ContainerId, EventId, Issue, IssueKind,
    MatchesRecord, RecordKind, RecordRead, SeedsRecord, StandingsRecord, UserId, UserRecord,
    ValidationReport, CONTAINER_INDEX_FILE, USERS_FILE,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::{AppError, SyncState};

const ATTRIBUTE_FIELDS: [&str; 11] = [
    "event_id",
    "tournament_name",
    "event_name",
    "timestamp",
    "region",
    "num_entrants",
    "offline",
    "url",
    "place",
    "labels",
    "status",
];

const PLACE_FIELDS: [&str; 9] = [
    "country_code",
    "city",
    "lat",
    "lng",
    "venue_name",
    "timezone",
    "postal_code",
    "venue_address",
    "maps_place_id",
];

const LIST_KINDS: [RecordKind; 3] = [RecordKind::Matches, RecordKind::Seeds, RecordKind::Standings];

const ORPHAN_SAMPLE: usize = 5;

fn record_path(dir: &str, kind: RecordKind) -> String {
    format!("{}/{}", dir, kind.file_name())
}

fn join_numbers<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Absent required keys, `place.*` included. Null is a value, not a missing field.
fn missing_attribute_fields(attributes: &Value) -> Vec<String> {
    let mut missing: Vec<String> = ATTRIBUTE_FIELDS
        .iter()
        .filter(|field| attributes.get(**field).is_none())
        .map(|field| field.to_string())
        .collect();
    let place = attributes.get("place").filter(|place| place.is_object());
    missing.extend(
        PLACE_FIELDS
            .iter()
            .filter(|field| place.and_then(|place| place.get(**field)).is_none())
            .map(|field| format!("place.{}", field)),
    );
    missing
}

struct DirCheck {
    event_id: Option<EventId>,
    issues: Vec<Issue>,
}

async fn check_event_dir(
    state: &SyncState,
    dir: &str,
    users: Option<&BTreeMap<UserId, UserRecord>>,
) -> anyhow::Result<DirCheck> {
    let mut issues = Vec::new();
    let mut present: BTreeMap<RecordKind, Value> = BTreeMap::new();
    let mut missing = Vec::new();

    for kind in RecordKind::ALL {
        match state.store.read_record(dir, kind).await? {
            RecordRead::Missing => missing.push(kind),
            RecordRead::Invalid(err) => {
                issues.push(Issue::new(IssueKind::InvalidJson, record_path(dir, kind), err))
            }
            RecordRead::Present(value) => {
                present.insert(kind, value);
            }
        }
    }

    if !missing.is_empty() {
        issues.push(Issue::new(
            IssueKind::PartialEvent,
            dir,
            format!("{} of 4 record files missing", missing.len()),
        ));
        for kind in &missing {
            issues.push(Issue::new(
                IssueKind::MissingFile,
                record_path(dir, *kind),
                "record file missing",
            ));
        }
    }

    let mut event_id = None;
    if let Some(attributes) = present.get(&RecordKind::Attributes) {
        event_id = attributes.get("event_id").and_then(Value::as_u64).map(EventId);
        let path = record_path(dir, RecordKind::Attributes);
        let missing_fields = missing_attribute_fields(attributes);
        let total = (ATTRIBUTE_FIELDS.len() + PLACE_FIELDS.len()) as f64;
        let rate = missing_fields.len() as f64 / total;
        if rate > state.config.missing_field_rate_threshold {
            issues.push(Issue::new(
                IssueKind::ThresholdExceeded,
                path,
                format!(
                    "{} of {} required fields missing ({:.0}%)",
                    missing_fields.len(),
                    total,
                    rate * 100.0
                ),
            ));
        } else {
            for field in missing_fields {
                issues.push(Issue::new(IssueKind::MissingField, path.clone(), field));
            }
        }
    }

    for kind in LIST_KINDS {
        if let Some(value) = present.get(&kind) {
            if !value.get("data").map(Value::is_array).unwrap_or(false) {
                issues.push(Issue::new(IssueKind::MissingField, record_path(dir, kind), "data"));
                present.remove(&kind);
            }
        }
    }

    let standings = present.get(&RecordKind::Standings).cloned().and_then(|value| {
        decode::<StandingsRecord>(value, dir, RecordKind::Standings, &mut issues)
    });
    let seeds = present
        .get(&RecordKind::Seeds)
        .cloned()
        .and_then(|value| decode::<SeedsRecord>(value, dir, RecordKind::Seeds, &mut issues));
    let matches = present
        .get(&RecordKind::Matches)
        .cloned()
        .and_then(|value| decode::<MatchesRecord>(value, dir, RecordKind::Matches, &mut issues));

    if let Some(standings) = &standings {
        let analysis = analyze_placements(&standings.data, !state.config.strict_placements);
        let unplaced = matches
            .as_ref()
            .map(|matches| unplaced_disqualified(standings, matches))
            .unwrap_or(0);
        if analysis.gaps.len() > unplaced {
            issues.push(Issue::new(
                IssueKind::PlacementGap,
                record_path(dir, RecordKind::Standings),
                format!("missing placement(s) {}", join_numbers(&analysis.gaps)),
            ));
        }
        if !analysis.duplicates.is_empty() {
            issues.push(Issue::new(
                IssueKind::PlacementDuplicate,
                record_path(dir, RecordKind::Standings),
                format!("repeated placement(s) {}", join_numbers(&analysis.duplicates)),
            ));
        }
    }

    if let Some(seeds) = &seeds {
        let duplicates = duplicate_seeds(&seeds.data);
        if !duplicates.is_empty() {
            issues.push(Issue::new(
                IssueKind::SeedDuplicate,
                record_path(dir, RecordKind::Seeds),
                format!("repeated seed(s) {}", join_numbers(&duplicates)),
            ));
        }
    }

    if let Some(users) = users {
        let referenced = users_in_records(standings.as_ref(), seeds.as_ref(), matches.as_ref());
        let orphans: Vec<UserId> = referenced
            .into_iter()
            .filter(|user_id| !users.contains_key(user_id))
            .collect();
        if !orphans.is_empty() {
            issues.push(Issue::new(
                IssueKind::OrphanedReference,
                dir,
                format!(
                    "{} user id(s) missing from {}: {}",
                    orphans.len(),
                    USERS_FILE,
                    join_numbers(orphans.iter().take(ORPHAN_SAMPLE))
                ),
            ));
        }
    }

    Ok(DirCheck { event_id, issues })
}

/// Disqualified entrants with no standing; each one accounts for a single placement gap.
fn unplaced_disqualified(standings: &StandingsRecord, matches: &MatchesRecord) -> usize {
    let placed: BTreeSet<UserId> =
        standings.data.iter().filter_map(|entry| entry.user_id).collect();
    let mut disqualified = BTreeSet::new();
    for record in matches.data.iter().filter(|record| record.dq) {
        if record.winner_score < 0 {
            disqualified.extend(record.winner_id);
        }
        if record.loser_score < 0 {
            disqualified.extend(record.loser_id);
        }
    }
    disqualified.difference(&placed).count()
}

fn decode<T: serde::de::DeserializeOwned>(
    value: Value,
    dir: &str,
    kind: RecordKind,
    issues: &mut Vec<Issue>,
) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(err) => {
            issues.push(Issue::new(
                IssueKind::InvalidJson,
                record_path(dir, kind),
                format!("unexpected shape: {}", err),
            ));
            None
        }
    }
}

fn users_in_records(
    standings: Option<&StandingsRecord>,
    seeds: Option<&SeedsRecord>,
    matches: Option<&MatchesRecord>,
) -> BTreeSet<UserId> {
    let mut users = BTreeSet::new();
    if let Some(standings) = standings {
        users.extend(standings.data.iter().filter_map(|entry| entry.user_id));
    }
    if let Some(seeds) = seeds {
        users.extend(seeds.data.iter().filter_map(|entry| entry.user_id));
    }
    if let Some(matches) = matches {
        users.extend(matches.data.iter().flat_map(match_user_refs));
    }
    users
}

async fn read_list<T: serde::de::DeserializeOwned>(
    state: &SyncState,
    dir: &str,
    kind: RecordKind,
) -> anyhow::Result<Option<T>> {
    match state.store.read_record(dir, kind).await? {
        RecordRead::Present(value) => Ok(serde_json::from_value(value).ok()),
        RecordRead::Missing | RecordRead::Invalid(_) => Ok(None),
    }
}

/// Every user id referenced by a stored standings, seeds or matches record.
pub async fn referenced_users(state: &SyncState) -> anyhow::Result<BTreeSet<UserId>> {
    let mut users = BTreeSet::new();
    for dir in state.store.list_event_dirs().await? {
        let standings: Option<StandingsRecord> =
            read_list(state, &dir, RecordKind::Standings).await?;
        let seeds: Option<SeedsRecord> = read_list(state, &dir, RecordKind::Seeds).await?;
        let matches: Option<MatchesRecord> = read_list(state, &dir, RecordKind::Matches).await?;
        users.extend(users_in_records(
            standings.as_ref(),
            seeds.as_ref(),
            matches.as_ref(),
        ));
    }
    Ok(users)
}

pub async fn validate_store(state: &SyncState) -> Result<ValidationReport, AppError> {
    let mut issues = Vec::new();

    let index = match state.index.load_all().await {
        Ok(records) => records,
        Err(err) => {
            warn!("container index unreadable: {}", err);
            issues.push(Issue::new(IssueKind::InvalidJson, CONTAINER_INDEX_FILE, err.to_string()));
            Vec::new()
        }
    };
    let users = match state.users.load_all().await {
        Ok(users) => Some(users),
        Err(err) => {
            warn!("user set unreadable: {}", err);
            issues.push(Issue::new(IssueKind::InvalidJson, USERS_FILE, err.to_string()));
            None
        }
    };

    let mut owner_of_event: BTreeMap<EventId, ContainerId> = BTreeMap::new();
    let mut event_at_path: BTreeMap<String, EventId> = BTreeMap::new();
    for record in &index {
        let container_id = Some(record.tournament_id);
        for event in &record.events {
            let locate = |kind: IssueKind, path: &str, detail: String| {
                Issue::new(kind, path, detail)
                    .container(container_id)
                    .event(Some(event.event_id))
            };
            match owner_of_event.get(&event.event_id) {
                Some(owner) if *owner != record.tournament_id => issues.push(locate(
                    IssueKind::IdCollision,
                    &event.path,
                    format!("event also indexed under container {}", owner),
                )),
                Some(_) => {}
                None => {
                    owner_of_event.insert(event.event_id, record.tournament_id);
                }
            }
            match event_at_path.get(&event.path) {
                Some(other) if *other != event.event_id => issues.push(locate(
                    IssueKind::PathCollision,
                    &event.path,
                    format!("path also indexed for event {}", other),
                )),
                Some(_) => {}
                None => {
                    event_at_path.insert(event.path.clone(), event.event_id);
                }
            }
            if !state.store.event_dir_exists(&event.path).await? {
                issues.push(locate(
                    IssueKind::DanglingIndexRef,
                    &event.path,
                    "indexed event directory is absent".to_string(),
                ));
            }
        }
    }

    let dirs = state.store.list_event_dirs().await?;
    let mut stored_at: BTreeMap<EventId, String> = BTreeMap::new();
    for dir in &dirs {
        let check = check_event_dir(state, dir, users.as_ref()).await?;
        let indexed_event = event_at_path.get(dir).copied();
        let event_id = check.event_id.or(indexed_event);
        let container_id = event_id.and_then(|id| owner_of_event.get(&id).copied());

        issues.extend(
            check
                .issues
                .into_iter()
                .map(|issue| issue.container(container_id).event(event_id)),
        );

        let locate = |kind: IssueKind, detail: String| {
            Issue::new(kind, dir.as_str(), detail)
                .container(container_id)
                .event(event_id)
        };
        match (check.event_id, indexed_event) {
            (_, None) => issues.push(locate(
                IssueKind::UnindexedEvent,
                "event directory not referenced by any container".to_string(),
            )),
            (Some(stored), Some(indexed)) if stored != indexed => issues.push(locate(
                IssueKind::IdCollision,
                format!(
                    "{} holds event {}, index says {}",
                    RecordKind::Attributes.file_name(),
                    stored,
                    indexed
                ),
            )),
            _ => {}
        }
        if let Some(stored) = check.event_id {
            if let Some(other) = stored_at.insert(stored, dir.clone()) {
                issues.push(locate(
                    IssueKind::IdCollision,
                    format!("event also stored at {}", other),
                ));
            }
        }
    }

    let report = ValidationReport::finalize(
        issues,
        dirs.len(),
        index.len(),
        state.config.max_integrity_issues,
    );
    info!(
        "validation checked {} event(s) in {} container(s): {} issue(s)",
        report.summary.events_checked, report.summary.containers_checked, report.summary.total
    );
    Ok(report)
}
