// Remote node shapes
// Deserialized views of the nodes returned by the results service.

use serde::Deserialize;

use crate::value_objects::{ContainerId, EntrantId, EventId, UserId};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentNode {
    pub id: ContainerId,
    pub name: String,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub venue_name: Option<String>,
    pub timezone: Option<String>,
    pub postal_code: Option<String>,
    pub venue_address: Option<String>,
    pub maps_place_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub id: EventId,
    pub name: String,
    pub start_at: Option<i64>,
    pub is_online: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEventsNode {
    pub id: ContainerId,
    pub name: String,
    pub events: Option<Vec<EventNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailsNode {
    pub id: EventId,
    pub name: String,
    pub start_at: Option<i64>,
    pub is_online: Option<bool>,
    pub tournament: TournamentNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationNode {
    pub external_id: Option<String>,
    pub external_username: Option<String>,
    #[serde(rename = "type")]
    pub auth_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub id: UserId,
    pub gender_pronoun: Option<String>,
    pub discriminator: Option<String>,
    pub authorizations: Option<Vec<AuthorizationNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNode {
    pub id: u64,
    pub gamer_tag: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantNode {
    pub user: Option<UserNode>,
    pub player: Option<PlayerNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrantNode {
    pub id: EntrantId,
    pub name: Option<String>,
    pub participants: Option<Vec<ParticipantNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingNode {
    pub placement: u32,
    pub entrant: EntrantNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedNode {
    pub seed_num: u32,
    pub entrant: EntrantNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrantRefNode {
    pub id: EntrantId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreNode {
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsNode {
    pub score: Option<ScoreNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotStandingNode {
    pub stats: Option<StatsNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotNode {
    pub entrant: Option<EntrantRefNode>,
    pub standing: Option<SlotStandingNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaveNode {
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseGroupNode {
    pub display_identifier: Option<String>,
    pub wave: Option<WaveNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageNode {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterNode {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionNode {
    pub id: u64,
    pub entrant: Option<EntrantRefNode>,
    pub character: Option<CharacterNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameNode {
    pub id: u64,
    pub order_num: Option<i32>,
    pub winner_id: Option<EntrantId>,
    pub entrant1_score: Option<i32>,
    pub entrant2_score: Option<i32>,
    pub stage: Option<StageNode>,
    pub selections: Option<Vec<SelectionNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNode {
    pub state: Option<i32>,
    pub round: Option<i32>,
    pub full_round_text: Option<String>,
    pub phase_group: Option<PhaseGroupNode>,
    pub slots: Option<Vec<SlotNode>>,
    pub games: Option<Vec<GameNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseRefNode {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventPhasesNode {
    pub phases: Option<Vec<PhaseRefNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventOwnerNode {
    pub id: EventId,
    pub name: Option<String>,
    pub tournament: Option<OwnerTournamentNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerTournamentNode {
    pub id: ContainerId,
    pub name: Option<String>,
}

/// A user lookup: the account plus its player profile.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetailsNode {
    #[serde(flatten)]
    pub user: UserNode,
    pub player: Option<PlayerNode>,
}
