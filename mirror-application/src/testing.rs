// In-memory ports for engine tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mirror_domain::{
    CheckpointLedger, ContainerId, ContainerIndex, EventId, EventLabels, EventRef, EventStore,
    LabelClassifier, Page, QueryKind, RecordKind, RecordRead, RemoteError, RemoteSource,
    RetryPolicy, RuntimeConfig, TournamentRecord, UserId, UserRecord, UserRepository, Variables,
};
use serde_json::{json, Value};

use crate::state::{SyncPorts, SyncState};

fn variables_key(vars: &Variables) -> String {
    serde_json::to_string(vars).unwrap_or_default()
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

type PageKey = (QueryKind, Option<String>, u32);
type OneKey = (QueryKind, Option<String>);

/// Remote whose responses are scripted per (kind, variables, page). The last
/// scripted response for a key repeats forever.
#[derive(Default)]
pub struct ScriptedRemote {
    pages: Mutex<HashMap<PageKey, VecDeque<Result<Page, RemoteError>>>>,
    singles: Mutex<HashMap<OneKey, VecDeque<Result<Value, RemoteError>>>>,
    calls: Mutex<Vec<(QueryKind, String, Option<u32>)>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, kind: QueryKind, page: u32, result: Result<Page, RemoteError>) {
        self.pages
            .lock()
            .expect("lock")
            .entry((kind, None, page))
            .or_default()
            .push_back(result);
    }

    pub fn push_page_for(
        &self,
        kind: QueryKind,
        vars: Value,
        page: u32,
        result: Result<Page, RemoteError>,
    ) {
        let key = variables_key(&crate::fetch::remote_calls::variables(vars));
        self.pages
            .lock()
            .expect("lock")
            .entry((kind, Some(key), page))
            .or_default()
            .push_back(result);
    }

    pub fn push_one_for(&self, kind: QueryKind, vars: Value, result: Result<Value, RemoteError>) {
        let key = variables_key(&crate::fetch::remote_calls::variables(vars));
        self.singles
            .lock()
            .expect("lock")
            .entry((kind, Some(key)))
            .or_default()
            .push_back(result);
    }

    /// Replaces whatever was scripted for the key.
    pub fn override_page_for(
        &self,
        kind: QueryKind,
        vars: Value,
        page: u32,
        result: Result<Page, RemoteError>,
    ) {
        let key = variables_key(&crate::fetch::remote_calls::variables(vars));
        self.pages
            .lock()
            .expect("lock")
            .insert((kind, Some(key), page), VecDeque::from([result]));
    }

    pub fn override_one_for(
        &self,
        kind: QueryKind,
        vars: Value,
        result: Result<Value, RemoteError>,
    ) {
        let key = variables_key(&crate::fetch::remote_calls::variables(vars));
        self.singles
            .lock()
            .expect("lock")
            .insert((kind, Some(key)), VecDeque::from([result]));
    }

    pub fn page_calls(&self, kind: QueryKind) -> Vec<u32> {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|(call_kind, _, _)| *call_kind == kind)
            .filter_map(|(_, _, page)| *page)
            .collect()
    }

    pub fn call_count(&self, kind: QueryKind) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|(call_kind, _, _)| *call_kind == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn fetch_page(
        &self,
        kind: QueryKind,
        variables: &Variables,
        page: u32,
        _per_page: u32,
    ) -> Result<Page, RemoteError> {
        let key = variables_key(variables);
        self.calls
            .lock()
            .expect("lock")
            .push((kind, key.clone(), Some(page)));
        let mut pages = self.pages.lock().expect("lock");
        if let Some(queue) = pages.get_mut(&(kind, Some(key), page)) {
            if let Some(result) = next_scripted(queue) {
                return result;
            }
        }
        if let Some(queue) = pages.get_mut(&(kind, None, page)) {
            if let Some(result) = next_scripted(queue) {
                return result;
            }
        }
        Ok(Page::default())
    }

    async fn fetch_one(
        &self,
        kind: QueryKind,
        variables: &Variables,
    ) -> Result<Value, RemoteError> {
        let key = variables_key(variables);
        self.calls.lock().expect("lock").push((kind, key.clone(), None));
        let mut singles = self.singles.lock().expect("lock");
        if let Some(queue) = singles.get_mut(&(kind, Some(key))) {
            if let Some(result) = next_scripted(queue) {
                return result;
            }
        }
        Ok(Value::Null)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    containers: Mutex<BTreeSet<ContainerId>>,
    events: Mutex<BTreeSet<EventId>>,
}

impl MemoryLedger {
    pub fn containers(&self) -> Vec<ContainerId> {
        self.containers.lock().expect("lock").iter().copied().collect()
    }
}

#[async_trait]
impl CheckpointLedger for MemoryLedger {
    async fn is_synchronized(&self, container_id: ContainerId) -> anyhow::Result<bool> {
        Ok(self.containers.lock().expect("lock").contains(&container_id))
    }

    async fn mark_synchronized(&self, container_id: ContainerId) -> anyhow::Result<bool> {
        Ok(self.containers.lock().expect("lock").insert(container_id))
    }

    async fn is_event_synchronized(&self, event_id: EventId) -> anyhow::Result<bool> {
        Ok(self.events.lock().expect("lock").contains(&event_id))
    }

    async fn mark_event_synchronized(&self, event_id: EventId) -> anyhow::Result<bool> {
        Ok(self.events.lock().expect("lock").insert(event_id))
    }
}

type RecordSet = BTreeMap<RecordKind, Result<Value, String>>;

#[derive(Default)]
pub struct MemoryStore {
    staging: Mutex<BTreeMap<EventId, BTreeMap<RecordKind, Value>>>,
    dirs: Mutex<BTreeMap<String, RecordSet>>,
}

impl MemoryStore {
    pub fn staged(&self, event_id: EventId) -> Vec<RecordKind> {
        self.staging
            .lock()
            .expect("lock")
            .get(&event_id)
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn record(&self, rel_path: &str, kind: RecordKind) -> Option<Value> {
        self.dirs
            .lock()
            .expect("lock")
            .get(rel_path)
            .and_then(|records| records.get(&kind))
            .and_then(|record| record.as_ref().ok().cloned())
    }

    pub fn put(&self, rel_path: &str, kind: RecordKind, value: Value) {
        self.dirs
            .lock()
            .expect("lock")
            .entry(rel_path.to_string())
            .or_default()
            .insert(kind, Ok(value));
    }

    pub fn put_invalid(&self, rel_path: &str, kind: RecordKind, error: &str) {
        self.dirs
            .lock()
            .expect("lock")
            .entry(rel_path.to_string())
            .or_default()
            .insert(kind, Err(error.to_string()));
    }

    pub fn remove_record(&self, rel_path: &str, kind: RecordKind) {
        if let Some(records) = self.dirs.lock().expect("lock").get_mut(rel_path) {
            records.remove(&kind);
        }
    }

    pub fn remove_dir(&self, rel_path: &str) {
        self.dirs.lock().expect("lock").remove(rel_path);
    }

    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<RecordKind, Value>> {
        self.dirs
            .lock()
            .expect("lock")
            .iter()
            .map(|(path, records)| {
                let records = records
                    .iter()
                    .filter_map(|(kind, record)| record.as_ref().ok().map(|v| (*kind, v.clone())))
                    .collect();
                (path.clone(), records)
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn clear_staging(&self, event_id: EventId) -> anyhow::Result<()> {
        self.staging.lock().expect("lock").remove(&event_id);
        Ok(())
    }

    async fn stage_record(
        &self,
        event_id: EventId,
        kind: RecordKind,
        value: &Value,
    ) -> anyhow::Result<()> {
        self.staging
            .lock()
            .expect("lock")
            .entry(event_id)
            .or_default()
            .insert(kind, value.clone());
        Ok(())
    }

    async fn staged_kinds(&self, event_id: EventId) -> anyhow::Result<Vec<RecordKind>> {
        Ok(self.staged(event_id))
    }

    async fn commit_staged(&self, event_id: EventId, rel_path: &str) -> anyhow::Result<()> {
        let records = self
            .staging
            .lock()
            .expect("lock")
            .remove(&event_id)
            .ok_or_else(|| anyhow::anyhow!("nothing staged for event {}", event_id))?;
        let records = records.into_iter().map(|(kind, value)| (kind, Ok(value))).collect();
        self.dirs.lock().expect("lock").insert(rel_path.to_string(), records);
        Ok(())
    }

    async fn read_record(&self, rel_path: &str, kind: RecordKind) -> anyhow::Result<RecordRead> {
        let dirs = self.dirs.lock().expect("lock");
        Ok(match dirs.get(rel_path).and_then(|records| records.get(&kind)) {
            None => RecordRead::Missing,
            Some(Ok(value)) => RecordRead::Present(value.clone()),
            Some(Err(error)) => RecordRead::Invalid(error.clone()),
        })
    }

    async fn write_record(
        &self,
        rel_path: &str,
        kind: RecordKind,
        value: &Value,
    ) -> anyhow::Result<()> {
        let mut dirs = self.dirs.lock().expect("lock");
        let records = dirs
            .get_mut(rel_path)
            .ok_or_else(|| anyhow::anyhow!("no event directory at {}", rel_path))?;
        records.insert(kind, Ok(value.clone()));
        Ok(())
    }

    async fn record_exists(&self, rel_path: &str, kind: RecordKind) -> anyhow::Result<bool> {
        Ok(self
            .dirs
            .lock()
            .expect("lock")
            .get(rel_path)
            .map(|records| records.contains_key(&kind))
            .unwrap_or(false))
    }

    async fn event_dir_exists(&self, rel_path: &str) -> anyhow::Result<bool> {
        Ok(self.dirs.lock().expect("lock").contains_key(rel_path))
    }

    async fn list_event_dirs(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .dirs
            .lock()
            .expect("lock")
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(path, _)| path.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<BTreeMap<ContainerId, TournamentRecord>>,
}

impl MemoryIndex {
    pub fn drop_event(&self, container_id: ContainerId, event_id: EventId) {
        if let Some(record) = self.records.lock().expect("lock").get_mut(&container_id) {
            record.events.retain(|event| event.event_id != event_id);
        }
    }

    pub fn insert(&self, record: TournamentRecord) {
        self.records
            .lock()
            .expect("lock")
            .insert(record.tournament_id, record);
    }
}

#[async_trait]
impl ContainerIndex for MemoryIndex {
    async fn load_all(&self) -> anyhow::Result<Vec<TournamentRecord>> {
        Ok(self.records.lock().expect("lock").values().cloned().collect())
    }

    async fn get(&self, container_id: ContainerId) -> anyhow::Result<Option<TournamentRecord>> {
        Ok(self.records.lock().expect("lock").get(&container_id).cloned())
    }

    async fn upsert_event(
        &self,
        container_id: ContainerId,
        container_name: &str,
        event: EventRef,
    ) -> anyhow::Result<bool> {
        let mut records = self.records.lock().expect("lock");
        let record = records
            .entry(container_id)
            .or_insert_with(|| TournamentRecord::new(container_id, container_name));
        Ok(record.upsert_event(event))
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<BTreeMap<UserId, UserRecord>>,
}

impl MemoryUsers {
    pub fn ids(&self) -> Vec<UserId> {
        self.users.lock().expect("lock").keys().copied().collect()
    }

    pub fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.users.lock().expect("lock").get(&user_id).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn load_all(&self) -> anyhow::Result<BTreeMap<UserId, UserRecord>> {
        Ok(self.users.lock().expect("lock").clone())
    }

    async fn save_all(&self, users: &[UserRecord]) -> anyhow::Result<()> {
        let mut stored = self.users.lock().expect("lock");
        stored.clear();
        stored.extend(users.iter().map(|user| (user.user_id, user.clone())));
        Ok(())
    }
}

pub struct FixedClassifier(pub Mutex<Option<EventLabels>>);

impl FixedClassifier {
    pub fn new(labels: Option<EventLabels>) -> Self {
        Self(Mutex::new(labels))
    }

    pub fn set(&self, labels: Option<EventLabels>) {
        *self.0.lock().expect("lock") = labels;
    }
}

#[async_trait]
impl LabelClassifier for FixedClassifier {
    async fn classify(&self, _: &str, _: &str, _: EventId) -> Option<EventLabels> {
        *self.0.lock().expect("lock")
    }
}

pub struct Harness {
    pub state: SyncState,
    pub remote: Arc<ScriptedRemote>,
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<MemoryStore>,
    pub index: Arc<MemoryIndex>,
    pub users: Arc<MemoryUsers>,
    pub classifier: Arc<FixedClassifier>,
}

pub fn harness() -> Harness {
    let config = RuntimeConfig {
        worker_count: 2,
        retry: RetryPolicy {
            max_attempts: 3,
            rate_limit_floor: Duration::from_secs(1),
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(40),
            attempt_timeout: Duration::from_secs(5),
        },
        ..RuntimeConfig::default()
    };
    let remote = Arc::new(ScriptedRemote::new());
    let ledger = Arc::new(MemoryLedger::default());
    let store = Arc::new(MemoryStore::default());
    let index = Arc::new(MemoryIndex::default());
    let users = Arc::new(MemoryUsers::default());
    let classifier = Arc::new(FixedClassifier::new(None));
    let state = SyncState::new(
        config,
        SyncPorts {
            remote: remote.clone(),
            ledger: ledger.clone(),
            store: store.clone(),
            index: index.clone(),
            users: users.clone(),
            classifier: classifier.clone(),
        },
    );
    Harness {
        state,
        remote,
        ledger,
        store,
        index,
        users,
        classifier,
    }
}

pub const START_AT: i64 = 1_700_000_000;

pub fn tournament_node(container_id: u64, name: &str) -> Value {
    json!({
        "id": container_id,
        "name": name,
        "startAt": START_AT,
        "endAt": START_AT + 3600,
        "countryCode": "JP",
        "url": format!("/tournament/{}", container_id),
    })
}

fn entrant(entrant_id: u64, user_id: u64) -> Value {
    json!({
        "id": entrant_id,
        "participants": [{
            "user": { "id": user_id },
            "player": { "id": user_id + 10_000, "gamerTag": format!("P{}", user_id) }
        }]
    })
}

fn slot(entrant_id: u64, score: i64) -> Value {
    json!({
        "entrant": { "id": entrant_id },
        "standing": { "stats": { "score": { "value": score } } }
    })
}

fn single_page(nodes: Vec<Value>) -> Page {
    Page {
        nodes,
        has_more: false,
        total_pages: Some(1),
    }
}

pub fn seeds_page(event_id: u64) -> Page {
    single_page(vec![
        json!({ "seedNum": 1, "entrant": entrant(1, 100 + event_id) }),
        json!({ "seedNum": 2, "entrant": entrant(2, 200 + event_id) }),
    ])
}

/// Scripts a complete, healthy event with two entrants (users 100+event and 200+event).
pub fn script_event(
    remote: &ScriptedRemote,
    container_id: u64,
    container_name: &str,
    event_id: u64,
    event_name: &str,
) {
    let user_a = 100 + event_id;
    let user_b = 200 + event_id;
    let phase_id = 5_000 + event_id;
    remote.push_one_for(
        QueryKind::EventDetails,
        json!({ "eventId": event_id }),
        Ok(json!({
            "id": event_id,
            "name": event_name,
            "startAt": START_AT,
            "isOnline": false,
            "tournament": tournament_node(container_id, container_name),
        })),
    );
    remote.push_page_for(
        QueryKind::EventStandings,
        json!({ "eventId": event_id }),
        1,
        Ok(single_page(vec![
            json!({ "placement": 1, "entrant": entrant(1, user_a) }),
            json!({ "placement": 2, "entrant": entrant(2, user_b) }),
        ])),
    );
    remote.push_one_for(
        QueryKind::EventPhases,
        json!({ "eventId": event_id }),
        Ok(json!({ "phases": [{ "id": phase_id }] })),
    );
    remote.push_page_for(
        QueryKind::PhaseSeeds,
        json!({ "phaseId": phase_id }),
        1,
        Ok(seeds_page(event_id)),
    );
    remote.push_page_for(
        QueryKind::EventSets,
        json!({ "eventId": event_id }),
        1,
        Ok(single_page(vec![json!({
            "state": 3,
            "round": 1,
            "fullRoundText": "Grand Final",
            "slots": [slot(1, 3), slot(2, 1)],
            "games": []
        })])),
    );
}

pub fn script_container(
    remote: &ScriptedRemote,
    container_id: u64,
    name: &str,
    events: &[(u64, &str)],
) {
    let events: Vec<Value> = events
        .iter()
        .map(|(id, event_name)| json!({ "id": id, "name": event_name }))
        .collect();
    remote.push_one_for(
        QueryKind::TournamentEvents,
        json!({ "tournamentId": container_id, "videogameId": RuntimeConfig::default().game_id }),
        Ok(json!({ "id": container_id, "name": name, "events": events })),
    );
}

pub fn script_listing(remote: &ScriptedRemote, tournaments: Vec<Value>) {
    remote.push_page(QueryKind::TournamentsByGame, 1, Ok(single_page(tournaments)));
}

/// Storage path for events built from the fixtures above.
pub fn fixture_path(container_name: &str, event_name: &str) -> String {
    mirror_domain::event_path_for_timestamp(
        mirror_domain::Region::Japan,
        START_AT,
        container_name,
        event_name,
    )
}
