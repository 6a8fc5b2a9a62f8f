// Per-event record entities
// The four JSON documents stored in every event directory.

use serde::{Deserialize, Serialize};

use crate::entities::container::RECORD_VERSION;
use crate::value_objects::{EventId, EventLabels, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Attributes,
    Standings,
    Seeds,
    Matches,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Attributes,
        RecordKind::Matches,
        RecordKind::Seeds,
        RecordKind::Standings,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            RecordKind::Attributes => "attr.json",
            RecordKind::Standings => "standings.json",
            RecordKind::Seeds => "seeds.json",
            RecordKind::Matches => "matches.json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Completed,
    Partial,
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub venue_name: Option<String>,
    pub timezone: Option<String>,
    pub postal_code: Option<String>,
    pub venue_address: Option<String>,
    pub maps_place_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttributes {
    pub version: String,
    pub event_id: EventId,
    pub tournament_name: String,
    pub event_name: String,
    pub timestamp: i64,
    pub region: String,
    pub place: Place,
    pub num_entrants: u32,
    pub offline: bool,
    pub url: Option<String>,
    pub labels: Option<EventLabels>,
    pub status: EventStatus,
}

impl EventAttributes {
    /// Structural fields from `incoming` win; labels are only replaced by a
    /// fresh classification, never erased by an unavailable one.
    pub fn merged_with_existing(mut incoming: EventAttributes, existing: &EventAttributes) -> Self {
        if incoming.labels.is_none() {
            incoming.labels = existing.labels;
        }
        incoming
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub placement: u32,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub seed_num: u32,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub user_id: Option<UserId>,
    pub selection_id: u64,
    pub character_id: Option<u64>,
    pub character_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: u64,
    pub order_num: Option<i32>,
    pub winner_id: Option<UserId>,
    pub entrant1_score: Option<i32>,
    pub entrant2_score: Option<i32>,
    pub stage: Option<String>,
    pub selections: Vec<SelectionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub winner_id: Option<UserId>,
    pub loser_id: Option<UserId>,
    pub winner_score: i32,
    pub loser_score: i32,
    pub round_text: Option<String>,
    pub round: Option<i32>,
    pub phase: Option<String>,
    pub wave: Option<String>,
    pub dq: bool,
    pub cancel: bool,
    pub state: Option<i32>,
    pub details: Vec<GameRecord>,
}

/// `{"version": "1.0", "data": [...]}` wrapper shared by the list records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord<T> {
    pub version: String,
    pub data: Vec<T>,
}

impl<T> ListRecord<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            data,
        }
    }
}

pub type StandingsRecord = ListRecord<StandingEntry>;
pub type SeedsRecord = ListRecord<SeedEntry>;
pub type MatchesRecord = ListRecord<MatchRecord>;

/// Everything the writer needs to commit one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBundle {
    pub attributes: EventAttributes,
    pub standings: StandingsRecord,
    pub seeds: SeedsRecord,
    pub matches: MatchesRecord,
}

impl EventBundle {
    pub fn referenced_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .standings
            .data
            .iter()
            .filter_map(|entry| entry.user_id)
            .chain(self.seeds.data.iter().filter_map(|entry| entry.user_id))
            .chain(self.matches.data.iter().flat_map(match_user_refs))
            .collect();
        users.sort();
        users.dedup();
        users
    }
}

pub fn match_user_refs(record: &MatchRecord) -> Vec<UserId> {
    let mut out: Vec<UserId> = [record.winner_id, record.loser_id]
        .into_iter()
        .flatten()
        .collect();
    for game in &record.details {
        out.extend(game.winner_id);
        out.extend(game.selections.iter().filter_map(|selection| selection.user_id));
    }
    out
}
