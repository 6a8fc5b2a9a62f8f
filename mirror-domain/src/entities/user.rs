// User entity
// One line of users.jsonl

use serde::{Deserialize, Serialize};

use crate::entities::container::RECORD_VERSION;
use crate::value_objects::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub player_id: Option<u64>,
    pub gamer_tag: Option<String>,
    pub prefix: Option<String>,
    pub gender_pronoun: String,
    pub startgg_discriminator: Option<String>,
    pub x_id: Option<String>,
    pub x_name: Option<String>,
    pub discord_id: Option<String>,
    pub discord_name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    RECORD_VERSION.to_string()
}

impl UserRecord {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            player_id: None,
            gamer_tag: None,
            prefix: None,
            gender_pronoun: "unknown".to_string(),
            startgg_discriminator: None,
            x_id: None,
            x_name: None,
            discord_id: None,
            discord_name: None,
            version: default_version(),
        }
    }
}
