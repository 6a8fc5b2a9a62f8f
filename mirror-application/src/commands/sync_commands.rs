use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use mirror_domain::{
    current_unix_seconds, ContainerId, ContainerOutcome, Drift, EntityRef, EventId, Failure,
    QueryKind, RecordKind, SyncPhase, SyncReport, TournamentNode, TournamentRecord, UserRecord,
};
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::commands::{absorb_profiles, fetch_and_write_event, find_drift, EventOutcome};
use crate::fetch::remote_calls::{fetch_tournament_events, variables};
use crate::fetch::Paginator;
use crate::{AppError, SyncState};

enum Candidate {
    Sync,
    Skip(&'static str),
    /// Listing is newest first; everything after this is older than the window.
    Stop,
}

struct ContainerRun {
    outcome: ContainerOutcome,
    profiles: Vec<UserRecord>,
}

async fn records_present(state: &SyncState, rel_path: &str) -> anyhow::Result<bool> {
    for kind in RecordKind::ALL {
        if !state.store.record_exists(rel_path, kind).await? {
            debug!("{} lacks {}", rel_path, kind.file_name());
            return Ok(false);
        }
    }
    Ok(true)
}

/// Every indexed event of the container still has all four record files.
async fn complete_on_disk(state: &SyncState, container_id: ContainerId) -> anyhow::Result<bool> {
    let Some(record) = state.index.get(container_id).await? else {
        return Ok(false);
    };
    if record.events.is_empty() {
        return Ok(false);
    }
    for event in &record.events {
        if !records_present(state, &event.path).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// An event indexed under this container whose directory already holds all four records.
async fn already_complete(
    state: &SyncState,
    indexed: Option<&TournamentRecord>,
    event_id: EventId,
) -> bool {
    let Some(event) = indexed.and_then(|record| record.find_event(event_id)) else {
        return false;
    };
    match records_present(state, &event.path).await {
        Ok(present) => present,
        Err(err) => {
            warn!("cannot inspect {}, fetching event {} again: {}", event.path, event_id, err);
            false
        }
    }
}

async fn classify_container(
    state: &SyncState,
    tournament: &TournamentNode,
    now: i64,
) -> anyhow::Result<Candidate> {
    let Some(end_at) = tournament.end_at else {
        return Ok(Candidate::Skip("no end time"));
    };
    if end_at > now {
        return Ok(Candidate::Skip("not finished"));
    }
    let start_at = tournament.start_at.unwrap_or(end_at);
    if let Some(upper) = state.config.window_end {
        if start_at > upper {
            return Ok(Candidate::Skip("newer than window"));
        }
    }
    if let Some(lower) = state.config.window_start {
        if start_at < lower {
            return Ok(Candidate::Stop);
        }
    }
    if state.ledger.is_synchronized(tournament.id).await? {
        if complete_on_disk(state, tournament.id).await? {
            return Ok(Candidate::Skip("already synchronized"));
        }
        warn!(
            "container {} is checkpointed but files are missing, fetching again",
            tournament.id
        );
    }
    Ok(Candidate::Sync)
}

async fn sync_container(state: SyncState, tournament: TournamentNode) -> ContainerRun {
    let container_id = tournament.id;
    let mut outcome = ContainerOutcome {
        container_id,
        name: tournament.name.clone(),
        events_written: 0,
        events_already_complete: 0,
        events_skipped: 0,
        failures: Vec::new(),
        checkpointed: false,
    };
    let mut profiles = Vec::new();

    let events = match fetch_tournament_events(&state, container_id).await {
        Ok(events) => events,
        Err(err) => {
            warn!("container {} event listing failed: {}", container_id, err);
            outcome.failures.push(Failure {
                entity: EntityRef::Container(container_id),
                reason: err.to_string(),
                deferred: err.is_deferred(),
            });
            return ContainerRun { outcome, profiles };
        }
    };
    if events.is_empty() {
        info!("container {} ({}) has no events for this game", container_id, tournament.name);
        return ContainerRun { outcome, profiles };
    }

    debug!(
        "container {} -> {:?} ({} event(s))",
        container_id,
        SyncPhase::FetchingEvent,
        events.len()
    );
    let indexed = match state.index.get(container_id).await {
        Ok(record) => record,
        Err(err) => {
            warn!("container {} index entry unreadable: {}", container_id, err);
            None
        }
    };
    for event in &events {
        if already_complete(&state, indexed.as_ref(), event.id).await {
            debug!("event {} already complete on disk", event.id);
            outcome.events_already_complete += 1;
            continue;
        }
        match fetch_and_write_event(&state, event.id).await {
            EventOutcome::Written {
                profiles: seen, ..
            } => {
                outcome.events_written += 1;
                profiles.extend(seen);
            }
            EventOutcome::Skipped { .. } => outcome.events_skipped += 1,
            EventOutcome::Failed { event_id, error } => outcome.failures.push(Failure {
                entity: EntityRef::Event(event_id),
                reason: error.to_string(),
                deferred: error.is_deferred(),
            }),
        }
    }

    if !outcome.failures.is_empty() {
        warn!(
            "container {} left unmarked: {} event(s) failed",
            container_id,
            outcome.failures.len()
        );
        return ContainerRun { outcome, profiles };
    }
    if outcome.events_written + outcome.events_already_complete == 0 {
        return ContainerRun { outcome, profiles };
    }

    debug!("container {} -> {:?}", container_id, SyncPhase::Checkpointing);
    match state.ledger.mark_synchronized(container_id).await {
        Ok(newly) => {
            outcome.checkpointed = true;
            state.metrics.record_checkpoint();
            if newly {
                info!(
                    "container {} ({}) synchronized: {} event(s)",
                    container_id, tournament.name, outcome.events_written
                );
            } else {
                info!("container {} refreshed", container_id);
            }
        }
        Err(err) => {
            error!("failed to checkpoint container {}: {}", container_id, err);
            outcome.failures.push(Failure {
                entity: EntityRef::Container(container_id),
                reason: err.to_string(),
                deferred: true,
            });
        }
    }
    ContainerRun { outcome, profiles }
}

fn record_run(report: &mut SyncReport, profiles: &mut Vec<UserRecord>, run: ContainerRun) {
    let outcome = run.outcome;
    if outcome.checkpointed {
        report.counts.containers_synced += 1;
    }
    report.counts.events_written += outcome.events_written;
    report.counts.events_already_complete += outcome.events_already_complete;
    report.counts.events_skipped += outcome.events_skipped;
    report.failures.extend(outcome.failures.iter().cloned());
    report.containers.push(outcome);
    profiles.extend(run.profiles);
}

pub async fn run_sync(state: &SyncState) -> Result<SyncReport, AppError> {
    run_sync_until(state, std::future::pending::<()>()).await
}

/// Full discovery run. When `shutdown` resolves, dispatch stops and in-flight containers
/// are dropped.
pub async fn run_sync_until<F>(state: &SyncState, shutdown: F) -> Result<SyncReport, AppError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut report = SyncReport::new(Uuid::new_v4().to_string());
    report.phase = SyncPhase::EnumeratingContainers;
    info!("sync run {} started", report.run_id);

    let now = current_unix_seconds();
    let mut vars = variables(json!({ "videogameId": state.config.game_id }));
    if let Some(country_code) = &state.config.country_code {
        vars.insert("countryCode".to_string(), json!(country_code));
    }
    let mut listing = Paginator::new(
        state.remote.as_ref(),
        &state.executor,
        QueryKind::TournamentsByGame,
        vars,
        state.config.page_sizes.tournaments,
    )
    .max_pages(state.config.max_pages);

    let semaphore = Arc::new(Semaphore::new(state.config.worker_count.max(1)));
    let mut workers: JoinSet<ContainerRun> = JoinSet::new();
    let mut profiles = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => {
                report.interrupted = true;
                break;
            }
            next = listing.next() => next,
        };
        let node = match next {
            Ok(Some(node)) => node,
            Ok(None) => break,
            Err(err) => {
                warn!("container listing stopped: {}", err);
                report.failures.push(Failure {
                    entity: EntityRef::Listing(err.failed_page),
                    reason: err.to_string(),
                    deferred: err.error.is_exhausted(),
                });
                break;
            }
        };
        let tournament: TournamentNode = match serde_json::from_value(node) {
            Ok(tournament) => tournament,
            Err(err) => {
                warn!("skipping malformed tournament node: {}", err);
                continue;
            }
        };
        report.counts.containers_seen += 1;

        match classify_container(state, &tournament, now).await? {
            Candidate::Sync => {}
            Candidate::Skip(reason) => {
                debug!("skipping container {}: {}", tournament.id, reason);
                report.counts.containers_skipped += 1;
                continue;
            }
            Candidate::Stop => {
                info!("container {} predates the window, listing done", tournament.id);
                break;
            }
        }

        let permit = tokio::select! {
            biased;
            _ = &mut shutdown => {
                report.interrupted = true;
                break;
            }
            permit = semaphore.clone().acquire_owned() => permit.map_err(|err| anyhow!(err))?,
        };
        let worker_state = state.clone();
        workers.spawn(async move {
            let _permit = permit;
            sync_container(worker_state, tournament).await
        });
    }

    if report.interrupted {
        warn!("shutdown requested, dropping {} in-flight container(s)", workers.len());
        workers.abort_all();
    }
    loop {
        let joined = tokio::select! {
            biased;
            _ = &mut shutdown, if !report.interrupted => {
                warn!("shutdown requested, dropping {} in-flight container(s)", workers.len());
                report.interrupted = true;
                workers.abort_all();
                continue;
            }
            joined = workers.join_next() => joined,
        };
        match joined {
            Some(Ok(run)) => record_run(&mut report, &mut profiles, run),
            Some(Err(err)) if err.is_cancelled() => {}
            Some(Err(err)) => error!("container worker failed: {}", err),
            None => break,
        }
    }
    report
        .containers
        .sort_by_key(|outcome| outcome.container_id);

    report.counts.new_users = absorb_profiles(state, profiles).await?;

    if !report.interrupted {
        report.phase = SyncPhase::Reconciling;
        let drift = find_drift(state).await?;
        report.drift_entries = drift.iter().map(Drift::entry_count).sum();
        if report.drift_entries > 0 {
            warn!(
                "index drift detected: {} entries, run reconcile --apply to repair",
                report.drift_entries
            );
        }
    }

    report.phase = SyncPhase::Done;
    info!(
        "sync run {} done: containers seen={} synced={} skipped={} events written={} \
         failures={} new users={}{}",
        report.run_id,
        report.counts.containers_seen,
        report.counts.containers_synced,
        report.counts.containers_skipped,
        report.counts.events_written,
        report.failures.len(),
        report.counts.new_users,
        if report.interrupted { " (interrupted)" } else { "" }
    );
    info!("metrics:\n{}", state.metrics.render_prometheus());
    Ok(report)
}
