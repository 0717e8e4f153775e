//! GET verification handshake.

use crate::error::IngressError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HubQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.topic")]
    pub topic: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// A topic is valid iff it starts with the platform's fixed feed prefix.
pub fn is_valid_topic(topic: &str) -> bool {
    topic.starts_with(feed_model::TOPIC_PREFIX)
}

/// Run the three checks from the verification table, in order, and return
/// the challenge to echo on success.
pub fn verify(query: &HubQuery, configured_token: &str) -> Result<String, IngressError> {
    let verify_token = query.verify_token.as_deref().unwrap_or("");
    if verify_token != configured_token {
        return Err(IngressError::VerifyTokenMismatch);
    }

    let topic = query.topic.as_deref().unwrap_or("");
    if !is_valid_topic(topic) {
        return Err(IngressError::UnrecognizedTopic);
    }

    match query.mode.as_deref() {
        Some("subscribe") | Some("unsubscribe") => {}
        _ => return Err(IngressError::UnrecognizedMode),
    }

    Ok(query.challenge.clone().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: &str, token: &str, topic: &str, challenge: &str) -> HubQuery {
        HubQuery {
            mode: Some(mode.to_owned()),
            verify_token: Some(token.to_owned()),
            topic: Some(topic.to_owned()),
            challenge: Some(challenge.to_owned()),
        }
    }

    const VALID_TOPIC: &str = "https://www.youtube.com/xml/feeds/videos.xml?channel_id=id";

    #[test]
    fn echoes_challenge_on_success() {
        let q = query("subscribe", "token", VALID_TOPIC, "C");
        assert_eq!(verify(&q, "token").unwrap(), "C");
    }

    #[test]
    fn rejects_wrong_token() {
        let q = query("subscribe", "wrong", VALID_TOPIC, "C");
        assert!(matches!(verify(&q, "token"), Err(IngressError::VerifyTokenMismatch)));
    }

    #[test]
    fn rejects_wrong_topic() {
        let q = query("subscribe", "token", "wrongtopic", "C");
        assert!(matches!(verify(&q, "token"), Err(IngressError::UnrecognizedTopic)));
    }

    #[test]
    fn rejects_unknown_mode() {
        let q = query("denied", "token", VALID_TOPIC, "C");
        assert!(matches!(verify(&q, "token"), Err(IngressError::UnrecognizedMode)));
    }
}
