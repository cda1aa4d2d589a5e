use serde::Deserialize;
use thiserror::Error;

use parley_core::Platform;

/// Webhook envelope as Meta delivers it: a batch of entries, each
/// holding a batch of messaging events. Unknown fields are ignored so
/// envelope additions on Meta's side never break parsing.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Sender,
    #[serde(default)]
    pub message: Option<InboundContent>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InboundContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReply>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postback {
    pub payload: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("webhook payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("messaging event from `{user_id}` carries no text or payload")]
    EmptyEvent { user_id: String },
}

/// One normalized turn: who sent it and the token the engine resolves.
/// Quick-reply payloads beat message text beat postback payloads, so a
/// tapped button always means its payload even when the tap also echoes
/// label text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: String,
    pub token: String,
    pub platform: Platform,
}

impl MessagingEvent {
    pub fn normalize(&self, platform: Platform) -> Result<InboundMessage, EventParseError> {
        let token = self
            .message
            .as_ref()
            .and_then(|content| {
                content
                    .quick_reply
                    .as_ref()
                    .map(|quick_reply| quick_reply.payload.as_str())
                    .or(content.text.as_deref())
            })
            .or(self.postback.as_ref().map(|postback| postback.payload.as_str()))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| EventParseError::EmptyEvent { user_id: self.sender.id.clone() })?;

        Ok(InboundMessage {
            user_id: self.sender.id.clone(),
            token: token.to_owned(),
            platform,
        })
    }
}

/// Parses one webhook delivery into normalized turns. Events with no
/// usable content (delivery receipts, read receipts, attachments-only
/// messages) are skipped rather than failing the whole batch.
pub fn parse_webhook(body: &str, platform: Platform) -> Result<Vec<InboundMessage>, EventParseError> {
    let payload: WebhookPayload = serde_json::from_str(body)
        .map_err(|error| EventParseError::InvalidJson(error.to_string()))?;

    let mut messages = Vec::new();
    for entry in &payload.entry {
        for event in &entry.messaging {
            if let Ok(message) = event.normalize(platform) {
                messages.push(message);
            }
        }
    }
    Ok(messages)
}

/// Query parameters of Meta's subscription handshake, sent as a GET to
/// the webhook path when the subscription is created.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerifyParams {
    /// Echoes the challenge back when the handshake matches the
    /// configured token; anything else is rejected.
    pub fn verify(&self, expected_token: &str) -> Option<&str> {
        match (self.mode.as_deref(), self.verify_token.as_deref(), self.challenge.as_deref()) {
            (Some("subscribe"), Some(token), Some(challenge)) if token == expected_token => {
                Some(challenge)
            }
            _ => None,
        }
    }
}
