// Label classifier adapters
// Failures never propagate: the engine treats them as "unavailable".

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use mirror_domain::{EventId, EventLabels, EventType, GameRule, LabelClassifier, RegistrationType};

/// Used when no classifier endpoint is configured.
#[derive(Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl LabelClassifier for UnavailableClassifier {
    async fn classify(
        &self,
        _tournament_name: &str,
        _event_name: &str,
        _event_id: EventId,
    ) -> Option<EventLabels> {
        None
    }
}

/// Posts `{tournament_name, event_name, event_id}` and expects the three label strings back.
pub struct HttpLabelClassifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpLabelClassifier {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    async fn request(
        &self,
        tournament_name: &str,
        event_name: &str,
        event_id: EventId,
    ) -> Result<Value> {
        let mut request = self.client.post(&self.url).json(&json!({
            "tournament_name": tournament_name,
            "event_name": event_name,
            "event_id": event_id,
        }));
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let value = request.send().await?.error_for_status()?.json().await?;
        Ok(value)
    }
}

/// Labels are enum-constrained; unknown strings map to the `Unknown` variants.
pub fn parse_labels(value: &Value) -> Option<EventLabels> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);
    Some(EventLabels {
        registration_type: RegistrationType::from(field("registration_type")?),
        event_type: EventType::from(field("event_type")?),
        game_rule: GameRule::from(field("game_rule")?),
    })
}

#[async_trait]
impl LabelClassifier for HttpLabelClassifier {
    async fn classify(
        &self,
        tournament_name: &str,
        event_name: &str,
        event_id: EventId,
    ) -> Option<EventLabels> {
        match self.request(tournament_name, event_name, event_id).await {
            Ok(value) => {
                let labels = parse_labels(&value);
                if labels.is_none() {
                    warn!("classifier returned incomplete labels for event {}", event_id);
                }
                labels
            }
            Err(err) => {
                warn!("classifier unavailable for event {}: {}", event_id, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown_label_strings() {
        let labels = parse_labels(&json!({
            "registration_type": "invitational",
            "event_type": "Singles",
            "game_rule": "something else",
        }))
        .expect("labels");
        assert_eq!(labels.registration_type, RegistrationType::InviteOnly);
        assert_eq!(labels.event_type, EventType::Singles);
        assert_eq!(labels.game_rule, GameRule::Unknown);
    }

    #[test]
    fn missing_label_field_is_unavailable() {
        assert!(parse_labels(&json!({ "event_type": "singles" })).is_none());
        assert!(parse_labels(&json!(null)).is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let classifier = HttpLabelClassifier::new(
            "http://127.0.0.1:9/classify",
            None,
            Duration::from_millis(200),
        )
        .expect("client");
        assert!(classifier.classify("Cup", "Singles", EventId(1)).await.is_none());
        assert!(UnavailableClassifier.classify("Cup", "Singles", EventId(1)).await.is_none());
    }
}
