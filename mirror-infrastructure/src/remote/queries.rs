// GraphQL documents for the results service
// `root` is the path from `data` to the connection (paginated) or object (single).

use mirror_domain::QueryKind;

pub struct QuerySpec {
    pub document: &'static str,
    pub root: &'static [&'static str],
    pub paginated: bool,
}

pub fn query_spec(kind: QueryKind) -> QuerySpec {
    match kind {
        QueryKind::TournamentsByGame => QuerySpec {
            document: TOURNAMENTS_BY_GAME,
            root: &["tournaments"],
            paginated: true,
        },
        QueryKind::TournamentEvents => QuerySpec {
            document: TOURNAMENT_EVENTS,
            root: &["tournament"],
            paginated: false,
        },
        QueryKind::EventDetails => QuerySpec {
            document: EVENT_DETAILS,
            root: &["event"],
            paginated: false,
        },
        QueryKind::EventStandings => QuerySpec {
            document: EVENT_STANDINGS,
            root: &["event", "standings"],
            paginated: true,
        },
        QueryKind::EventPhases => QuerySpec {
            document: EVENT_PHASES,
            root: &["event"],
            paginated: false,
        },
        QueryKind::PhaseSeeds => QuerySpec {
            document: PHASE_SEEDS,
            root: &["phase", "seeds"],
            paginated: true,
        },
        QueryKind::EventSets => QuerySpec {
            document: EVENT_SETS,
            root: &["event", "sets"],
            paginated: true,
        },
        QueryKind::EventOwner => QuerySpec {
            document: EVENT_OWNER,
            root: &["event"],
            paginated: false,
        },
        QueryKind::UserDetails => QuerySpec {
            document: USER_DETAILS,
            root: &["user"],
            paginated: false,
        },
    }
}

const TOURNAMENTS_BY_GAME: &str = r#"
query TournamentsByGame($videogameId: ID!, $countryCode: String, $page: Int!, $perPage: Int!) {
  tournaments(query: {
    page: $page
    perPage: $perPage
    sortBy: "startAt desc"
    filter: { videogameIds: [$videogameId], past: true, countryCode: $countryCode }
  }) {
    pageInfo { total totalPages }
    nodes {
      id name startAt endAt countryCode city lat lng venueName timezone
      postalCode venueAddress mapsPlaceId url(relative: false)
    }
  }
}"#;

const TOURNAMENT_EVENTS: &str = r#"
query TournamentEvents($tournamentId: ID!, $videogameId: ID!) {
  tournament(id: $tournamentId) {
    id
    name
    events(filter: { videogameId: [$videogameId] }) { id name startAt isOnline }
  }
}"#;

const EVENT_DETAILS: &str = r#"
query EventDetails($eventId: ID!) {
  event(id: $eventId) {
    id name startAt isOnline
    tournament {
      id name startAt endAt countryCode city lat lng venueName timezone
      postalCode venueAddress mapsPlaceId url(relative: false)
    }
  }
}"#;

const EVENT_STANDINGS: &str = r#"
query EventStandings($eventId: ID!, $page: Int!, $perPage: Int!) {
  event(id: $eventId) {
    standings(query: { page: $page, perPage: $perPage }) {
      pageInfo { total totalPages }
      nodes {
        placement
        entrant {
          id name
          participants {
            user {
              id genderPronoun discriminator
              authorizations(types: [TWITTER, DISCORD]) { externalId externalUsername type }
            }
            player { id gamerTag prefix }
          }
        }
      }
    }
  }
}"#;

const EVENT_PHASES: &str = r#"
query EventPhases($eventId: ID!) {
  event(id: $eventId) {
    phases { id }
  }
}"#;

const PHASE_SEEDS: &str = r#"
query PhaseSeeds($phaseId: ID!, $page: Int!, $perPage: Int!) {
  phase(id: $phaseId) {
    seeds(query: { page: $page, perPage: $perPage }) {
      pageInfo { total totalPages }
      nodes {
        seedNum
        entrant {
          id name
          participants {
            user {
              id genderPronoun discriminator
              authorizations(types: [TWITTER, DISCORD]) { externalId externalUsername type }
            }
            player { id gamerTag prefix }
          }
        }
      }
    }
  }
}"#;

const EVENT_SETS: &str = r#"
query EventSets($eventId: ID!, $page: Int!, $perPage: Int!) {
  event(id: $eventId) {
    sets(page: $page, perPage: $perPage, sortType: STANDARD) {
      pageInfo { total totalPages }
      nodes {
        state round fullRoundText
        phaseGroup { displayIdentifier wave { identifier } }
        slots {
          entrant { id }
          standing { stats { score { value } } }
        }
        games {
          id orderNum winnerId entrant1Score entrant2Score
          stage { name }
          selections { id entrant { id } character { id name } }
        }
      }
    }
  }
}"#;

const EVENT_OWNER: &str = r#"
query EventOwner($eventId: ID!) {
  event(id: $eventId) {
    id name
    tournament { id name }
  }
}"#;

const USER_DETAILS: &str = r#"
query UserDetails($userId: ID!) {
  user(id: $userId) {
    id genderPronoun discriminator
    authorizations(types: [TWITTER, DISCORD]) { externalId externalUsername type }
    player { id gamerTag prefix }
  }
}"#;
