// Classification label value objects
// Produced by an external classifier, never derived from free text here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationType {
    Open,
    InviteOnly,
    Qualifier,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Singles,
    Doubles,
    Team,
    Side,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameRule {
    Standard,
    Custom,
    Handicap,
    Unknown,
}

impl RegistrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationType::Open => "open",
            RegistrationType::InviteOnly => "invite_only",
            RegistrationType::Qualifier => "qualifier",
            RegistrationType::Unknown => "unknown",
        }
    }
}

impl From<&str> for RegistrationType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "open" => RegistrationType::Open,
            "invite_only" | "invite" | "invitational" => RegistrationType::InviteOnly,
            "qualifier" => RegistrationType::Qualifier,
            _ => RegistrationType::Unknown,
        }
    }
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Singles => "singles",
            EventType::Doubles => "doubles",
            EventType::Team => "team",
            EventType::Side => "side",
            EventType::Unknown => "unknown",
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "singles" => EventType::Singles,
            "doubles" => EventType::Doubles,
            "team" | "crew" | "squad" => EventType::Team,
            "side" => EventType::Side,
            _ => EventType::Unknown,
        }
    }
}

impl GameRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameRule::Standard => "standard",
            GameRule::Custom => "custom",
            GameRule::Handicap => "handicap",
            GameRule::Unknown => "unknown",
        }
    }
}

impl From<&str> for GameRule {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "standard" => GameRule::Standard,
            "custom" => GameRule::Custom,
            "handicap" => GameRule::Handicap,
            _ => GameRule::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLabels {
    pub registration_type: RegistrationType,
    pub event_type: EventType,
    pub game_rule: GameRule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strings_map_to_unknown_variants() {
        assert_eq!(RegistrationType::from("Invitational"), RegistrationType::InviteOnly);
        assert_eq!(EventType::from("crew"), EventType::Team);
        assert_eq!(GameRule::from("??"), GameRule::Unknown);
    }

    #[test]
    fn labels_serialize_as_snake_case() {
        let labels = EventLabels {
            registration_type: RegistrationType::InviteOnly,
            event_type: EventType::Singles,
            game_rule: GameRule::Standard,
        };
        let value = serde_json::to_value(labels).expect("serialize labels");
        assert_eq!(value["registration_type"], "invite_only");
        assert_eq!(value["event_type"], "singles");
        assert_eq!(value["game_rule"], "standard");
    }
}
