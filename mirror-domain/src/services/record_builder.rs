// Converts remote nodes into the canonical on-disk records.

use std::collections::{BTreeMap, HashMap};

use crate::entities::{
    EntrantNode, EventAttributes, EventDetailsNode, EventStatus, GameRecord, ListRecord,
    MatchRecord, MatchesRecord, ParticipantNode, Place, PlayerNode, SeedEntry, SeedNode,
    SeedsRecord, SelectionRecord, SetNode, SlotNode, StandingEntry, StandingNode,
    StandingsRecord, TournamentNode, UserNode, UserRecord, RECORD_VERSION,
};
use crate::value_objects::{EntrantId, EventLabels, Region, UserId};

/// Entrant → user resolution collected from standings and seeds, plus the
/// participant profiles seen along the way.
#[derive(Debug, Default)]
pub struct EntrantDirectory {
    users: HashMap<EntrantId, UserId>,
    profiles: BTreeMap<UserId, UserRecord>,
}

impl EntrantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the entrant has no participant list (team placeholders).
    fn absorb(&mut self, entrant: &EntrantNode) -> bool {
        let Some(first) = entrant.participants.as_ref().and_then(|list| list.first()) else {
            return false;
        };
        if self.users.contains_key(&entrant.id) {
            return true;
        }
        if let ParticipantNode {
            user: Some(user),
            player: Some(player),
        } = first
        {
            self.users.insert(entrant.id, user.id);
            self.profiles
                .entry(user.id)
                .or_insert_with(|| profile_from(user, Some(player)));
        }
        true
    }

    pub fn user_for(&self, entrant_id: EntrantId) -> Option<UserId> {
        self.users.get(&entrant_id).copied()
    }

    pub fn into_profiles(self) -> Vec<UserRecord> {
        self.profiles.into_values().collect()
    }
}

pub fn profile_from(user: &UserNode, player: Option<&PlayerNode>) -> UserRecord {
    let mut record = UserRecord::new(user.id);
    record.player_id = player.map(|value| value.id);
    record.gamer_tag = player.and_then(|value| value.gamer_tag.clone());
    record.prefix = player.and_then(|value| value.prefix.clone());
    record.gender_pronoun = user
        .gender_pronoun
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    record.startgg_discriminator = user.discriminator.clone();
    for auth in user.authorizations.iter().flatten() {
        match auth.auth_type.as_deref() {
            Some("TWITTER") => {
                record.x_id = auth.external_id.clone();
                record.x_name = auth.external_username.clone();
            }
            Some("DISCORD") => {
                record.discord_id = auth.external_id.clone();
                record.discord_name = auth.external_username.clone();
            }
            _ => {}
        }
    }
    record
}

/// Entries without a participant list are dropped; returns the record and the entrant count.
pub fn build_standings(
    nodes: &[StandingNode],
    directory: &mut EntrantDirectory,
) -> (StandingsRecord, u32) {
    let mut entries = Vec::new();
    for node in nodes {
        if !directory.absorb(&node.entrant) {
            continue;
        }
        entries.push(StandingEntry {
            placement: node.placement,
            user_id: directory.user_for(node.entrant.id),
        });
    }
    entries.sort_by_key(|entry| entry.placement);
    let count = entries.len() as u32;
    (ListRecord::new(entries), count)
}

pub fn build_seeds(nodes: &[SeedNode], directory: &mut EntrantDirectory) -> SeedsRecord {
    let mut entries: Vec<SeedEntry> = nodes
        .iter()
        .map(|node| {
            directory.absorb(&node.entrant);
            SeedEntry {
                seed_num: node.seed_num,
                user_id: directory.user_for(node.entrant.id),
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.seed_num);
    ListRecord::new(entries)
}

fn slot_score(slot: &SlotNode) -> Option<i32> {
    let standing = slot.standing.as_ref()?;
    let value = standing
        .stats
        .as_ref()
        .and_then(|stats| stats.score.as_ref())
        .and_then(|score| score.value)
        .unwrap_or(0.0);
    Some(value as i32)
}

pub fn build_matches(nodes: &[SetNode], directory: &EntrantDirectory) -> MatchesRecord {
    let mut records = Vec::new();
    for node in nodes {
        let pair = node
            .slots
            .as_deref()
            .and_then(|slots| <&[SlotNode; 2]>::try_from(slots).ok());
        let Some([slot0, slot1]) = pair else {
            continue;
        };
        let (Some(entrant0), Some(entrant1)) = (slot0.entrant.as_ref(), slot1.entrant.as_ref())
        else {
            continue;
        };
        let (Some(score0), Some(score1)) = (slot_score(slot0), slot_score(slot1)) else {
            continue;
        };

        let (winner, loser, winner_score, loser_score) = if score0 > score1 {
            (entrant0.id, entrant1.id, score0, score1)
        } else {
            (entrant1.id, entrant0.id, score1, score0)
        };

        let details = node
            .games
            .iter()
            .flatten()
            .map(|game| GameRecord {
                game_id: game.id,
                order_num: game.order_num,
                winner_id: game.winner_id.and_then(|id| directory.user_for(id)),
                entrant1_score: game.entrant1_score,
                entrant2_score: game.entrant2_score,
                stage: game.stage.as_ref().and_then(|stage| stage.name.clone()),
                selections: game
                    .selections
                    .iter()
                    .flatten()
                    .map(|selection| SelectionRecord {
                        user_id: selection
                            .entrant
                            .as_ref()
                            .and_then(|entrant| directory.user_for(entrant.id)),
                        selection_id: selection.id,
                        character_id: selection.character.as_ref().and_then(|c| c.id),
                        character_name: selection.character.as_ref().and_then(|c| c.name.clone()),
                    })
                    .collect(),
            })
            .collect();

        let phase_group = node.phase_group.as_ref();
        records.push(MatchRecord {
            winner_id: directory.user_for(winner),
            loser_id: directory.user_for(loser),
            winner_score,
            loser_score,
            round_text: node.full_round_text.clone(),
            round: node.round,
            phase: phase_group.and_then(|group| group.display_identifier.clone()),
            wave: phase_group
                .and_then(|group| group.wave.as_ref())
                .and_then(|wave| wave.identifier.clone()),
            dq: score0 < 0 || score1 < 0,
            cancel: score0 == 0 && score1 == 0,
            state: node.state,
            details,
        });
    }
    ListRecord::new(records)
}

pub fn place_from(tournament: &TournamentNode) -> Place {
    Place {
        country_code: tournament.country_code.clone(),
        city: tournament.city.clone(),
        lat: tournament.lat,
        lng: tournament.lng,
        venue_name: tournament.venue_name.clone(),
        timezone: tournament.timezone.clone(),
        postal_code: tournament.postal_code.clone(),
        venue_address: tournament.venue_address.clone(),
        maps_place_id: tournament.maps_place_id.clone(),
    }
}

/// Start time used for the storage date: the container start, falling back to the event's.
pub fn event_timestamp(details: &EventDetailsNode) -> i64 {
    details
        .tournament
        .start_at
        .or(details.start_at)
        .unwrap_or_default()
}

pub fn event_region(details: &EventDetailsNode) -> Region {
    Region::from_country_code(details.tournament.country_code.as_deref())
}

pub fn build_attributes(
    details: &EventDetailsNode,
    num_entrants: u32,
    labels: Option<EventLabels>,
) -> EventAttributes {
    EventAttributes {
        version: RECORD_VERSION.to_string(),
        event_id: details.id,
        tournament_name: details.tournament.name.clone(),
        event_name: details.name.clone(),
        timestamp: event_timestamp(details),
        region: event_region(details).as_str().to_string(),
        place: place_from(&details.tournament),
        num_entrants,
        offline: !details.is_online.unwrap_or(false),
        url: details.tournament.url.clone(),
        labels,
        status: EventStatus::Completed,
    }
}
