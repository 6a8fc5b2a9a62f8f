// Typed remote lookups
// Every call goes through the shared RetryExecutor; nodes are decoded here.

use mirror_domain::{
    ContainerId, EventDetailsNode, EventId, EventNode, EventOwnerNode, EventPhasesNode, QueryKind,
    SeedNode, SetNode, StandingNode, TournamentEventsNode, UserDetailsNode, UserId, Variables,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::fetch::Paginator;
use crate::{SyncError, SyncState};

pub fn variables(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}

fn decode<T: DeserializeOwned>(kind: QueryKind, value: Value) -> Result<T, SyncError> {
    serde_json::from_value(value).map_err(|err| SyncError::Malformed {
        kind,
        message: err.to_string(),
    })
}

pub async fn fetch_all<T: DeserializeOwned>(
    state: &SyncState,
    kind: QueryKind,
    vars: Variables,
    per_page: u32,
) -> Result<Vec<T>, SyncError> {
    let nodes = Paginator::new(state.remote.as_ref(), &state.executor, kind, vars, per_page)
        .max_pages(state.config.max_pages)
        .collect_all()
        .await?;
    nodes.into_iter().map(|node| decode(kind, node)).collect()
}

pub async fn fetch_single<T: DeserializeOwned>(
    state: &SyncState,
    kind: QueryKind,
    vars: Variables,
) -> Result<Option<T>, SyncError> {
    let remote = state.remote.as_ref();
    let vars = &vars;
    let value = state
        .executor
        .run_remote(kind.as_str(), || remote.fetch_one(kind, vars))
        .await?;
    if value.is_null() {
        return Ok(None);
    }
    decode(kind, value).map(Some)
}

pub async fn fetch_tournament_events(
    state: &SyncState,
    container_id: ContainerId,
) -> Result<Vec<EventNode>, SyncError> {
    let vars = variables(json!({
        "tournamentId": container_id,
        "videogameId": state.config.game_id,
    }));
    let node: Option<TournamentEventsNode> =
        fetch_single(state, QueryKind::TournamentEvents, vars).await?;
    match node {
        Some(node) => Ok(node.events.unwrap_or_default()),
        None => Err(SyncError::NotFound(format!("tournament {}", container_id))),
    }
}

pub async fn fetch_event_details(
    state: &SyncState,
    event_id: EventId,
) -> Result<EventDetailsNode, SyncError> {
    let vars = variables(json!({ "eventId": event_id }));
    fetch_single(state, QueryKind::EventDetails, vars)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("event {}", event_id)))
}

pub async fn fetch_standings(
    state: &SyncState,
    event_id: EventId,
) -> Result<Vec<StandingNode>, SyncError> {
    let vars = variables(json!({ "eventId": event_id }));
    fetch_all(
        state,
        QueryKind::EventStandings,
        vars,
        state.config.page_sizes.standings,
    )
    .await
}

/// Seeds come from the event's first phase. No phase means no seeds source.
pub async fn fetch_seeds(state: &SyncState, event_id: EventId) -> Result<Vec<SeedNode>, SyncError> {
    let vars = variables(json!({ "eventId": event_id }));
    let phases: Option<EventPhasesNode> =
        fetch_single(state, QueryKind::EventPhases, vars).await?;
    let phase_id = phases
        .and_then(|node| node.phases)
        .and_then(|list| list.first().map(|phase| phase.id))
        .ok_or(SyncError::NoPhase(event_id))?;

    let vars = variables(json!({ "phaseId": phase_id }));
    fetch_all(state, QueryKind::PhaseSeeds, vars, state.config.page_sizes.seeds).await
}

pub async fn fetch_sets(state: &SyncState, event_id: EventId) -> Result<Vec<SetNode>, SyncError> {
    let vars = variables(json!({ "eventId": event_id }));
    fetch_all(state, QueryKind::EventSets, vars, state.config.page_sizes.sets).await
}

pub async fn fetch_event_owner(
    state: &SyncState,
    event_id: EventId,
) -> Result<Option<EventOwnerNode>, SyncError> {
    let vars = variables(json!({ "eventId": event_id }));
    fetch_single(state, QueryKind::EventOwner, vars).await
}

pub async fn fetch_user_details(
    state: &SyncState,
    user_id: UserId,
) -> Result<Option<UserDetailsNode>, SyncError> {
    let vars = variables(json!({ "userId": user_id }));
    fetch_single(state, QueryKind::UserDetails, vars).await
}
