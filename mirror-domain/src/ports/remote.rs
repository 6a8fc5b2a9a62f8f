use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::RemoteError;

/// Query shapes the engine issues. The transport owns the documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    TournamentsByGame,
    TournamentEvents,
    EventDetails,
    EventStandings,
    EventPhases,
    PhaseSeeds,
    EventSets,
    EventOwner,
    UserDetails,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::TournamentsByGame => "tournaments_by_game",
            QueryKind::TournamentEvents => "tournament_events",
            QueryKind::EventDetails => "event_details",
            QueryKind::EventStandings => "event_standings",
            QueryKind::EventPhases => "event_phases",
            QueryKind::PhaseSeeds => "phase_seeds",
            QueryKind::EventSets => "event_sets",
            QueryKind::EventOwner => "event_owner",
            QueryKind::UserDetails => "user_details",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Variables = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub nodes: Vec<Value>,
    pub has_more: bool,
    pub total_pages: Option<u32>,
}

/// The remote results service as a capability.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// One page (1-based) of a paginated connection.
    async fn fetch_page(
        &self,
        kind: QueryKind,
        variables: &Variables,
        page: u32,
        per_page: u32,
    ) -> Result<Page, RemoteError>;

    /// A single, non-paginated object. `Ok(Value::Null)` when the remote reports nothing.
    async fn fetch_one(&self, kind: QueryKind, variables: &Variables) -> Result<Value, RemoteError>;
}
