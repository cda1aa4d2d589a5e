use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use parley_core::{Platform, Reply};

const GRAPH_API_SEND_URL: &str = "https://graph.facebook.com/v20.0/me/messages";
const MAX_QUICK_REPLIES: usize = 13;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery transport failure: {0}")]
    Transport(String),
    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound edge of a channel. Implementations own the platform envelope
/// and credentials; callers hand over the engine's reply as-is.
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    async fn send(
        &self,
        user_id: &str,
        reply: &Reply,
        platform: Platform,
    ) -> Result<(), DeliveryError>;
}

/// Sends via Meta's Graph API. One POST per reply; quick replies ride on
/// the message as tappable text buttons.
pub struct GraphApiDelivery {
    client: Client,
    page_token: SecretString,
}

impl GraphApiDelivery {
    pub fn new(client: Client, page_token: SecretString) -> Self {
        Self { client, page_token }
    }

    fn envelope(user_id: &str, reply: &Reply) -> Value {
        let mut message = json!({ "text": reply.text });
        if !reply.choices.is_empty() {
            // Graph API caps quick replies per message; anything past the
            // cap is dropped rather than failing the send.
            let quick_replies: Vec<Value> = reply
                .choices
                .iter()
                .take(MAX_QUICK_REPLIES)
                .map(|choice| {
                    json!({
                        "content_type": "text",
                        "title": choice.label,
                        "payload": choice.payload,
                    })
                })
                .collect();
            message["quick_replies"] = Value::Array(quick_replies);
        }
        json!({ "recipient": { "id": user_id }, "message": message })
    }
}

#[async_trait]
impl MessageDelivery for GraphApiDelivery {
    async fn send(
        &self,
        user_id: &str,
        reply: &Reply,
        platform: Platform,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(GRAPH_API_SEND_URL)
            .query(&[("access_token", self.page_token.expose_secret())])
            .json(&Self::envelope(user_id, reply))
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                event_name = "delivery.rejected",
                user_id,
                platform = platform.as_str(),
                status = status.as_u16(),
                "send rejected"
            );
            return Err(DeliveryError::Rejected { status: status.as_u16(), body });
        }

        debug!(
            event_name = "delivery.sent",
            user_id,
            platform = platform.as_str(),
            "reply delivered"
        );
        Ok(())
    }
}

/// Logs the reply instead of sending it. Used when no page token is
/// configured, which keeps local runs and tests off the network.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDelivery;

#[async_trait]
impl MessageDelivery for NoopDelivery {
    async fn send(
        &self,
        user_id: &str,
        reply: &Reply,
        platform: Platform,
    ) -> Result<(), DeliveryError> {
        debug!(
            event_name = "delivery.noop",
            user_id,
            platform = platform.as_str(),
            text = %reply.text,
            "reply dropped (no delivery configured)"
        );
        Ok(())
    }
}
