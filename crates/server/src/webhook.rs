use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use parley_channels::{parse_webhook, InboundMessage, MessageDelivery, VerifyParams};
use parley_core::{DialogueEngine, Platform, TurnError, UserGates};

#[derive(Clone)]
pub struct WebhookState {
    pub engine: Arc<DialogueEngine>,
    pub delivery: Arc<dyn MessageDelivery>,
    pub gates: Arc<UserGates>,
    pub verify_token: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", get(verify).post(receive)).with_state(state)
}

/// Meta's subscription handshake. Echoes the challenge on a token match
/// and refuses everything else.
async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Result<String, StatusCode> {
    match params.verify(&state.verify_token) {
        Some(challenge) => {
            info!(event_name = "webhook.verified", "subscription handshake accepted");
            Ok(challenge.to_owned())
        }
        None => {
            warn!(event_name = "webhook.verify_rejected", "subscription handshake rejected");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// One webhook delivery. Every usable event in the batch is resolved and
/// answered before the acknowledgement goes out; per-user gates keep
/// turns for the same sender in order while distinct senders proceed in
/// parallel deliveries.
async fn receive(State(state): State<WebhookState>, body: String) -> (StatusCode, &'static str) {
    let messages = match parse_webhook(&body, Platform::Meta) {
        Ok(messages) => messages,
        Err(error) => {
            let turn_error = TurnError::MalformedInput { detail: error.to_string() };
            warn!(event_name = "webhook.malformed", error = %turn_error, "webhook body rejected");
            return (StatusCode::BAD_REQUEST, turn_error.user_message());
        }
    };

    let correlation_id = Uuid::new_v4().simple().to_string();
    for message in messages {
        process_turn(&state, &message, &correlation_id).await;
    }

    (StatusCode::OK, "EVENT_RECEIVED")
}

async fn process_turn(state: &WebhookState, message: &InboundMessage, correlation_id: &str) {
    let gate = state.gates.gate(&message.user_id);
    let _turn = gate.lock().await;

    info!(
        event_name = "webhook.turn_started",
        correlation_id,
        user_id = %message.user_id,
        platform = message.platform.as_str(),
        "turn started"
    );

    let reply = state.engine.resolve(&message.user_id, &message.token, message.platform).await;

    if let Err(error) =
        state.delivery.send(&message.user_id, &reply, message.platform).await
    {
        // The turn's session mutations stand; only the outbound copy was
        // lost, and Meta will not redeliver it.
        warn!(
            event_name = "webhook.delivery_failed",
            correlation_id,
            user_id = %message.user_id,
            error = %error,
            "reply delivery failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use parley_channels::NoopDelivery;
    use parley_core::config::AppConfig;
    use parley_core::ports::{NoopIntakeSink, NoopInventoryService, NoopSchedulingService};
    use parley_core::{DialogueEngine, FlowCategory, SessionStore, UserGates};

    use super::{router, WebhookState};

    fn state() -> (WebhookState, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new());
        let engine = Arc::new(DialogueEngine::new(
            AppConfig::default().business,
            Arc::clone(&store),
            Arc::new(NoopInventoryService),
            Arc::new(NoopSchedulingService),
            Arc::new(NoopIntakeSink),
        ));
        (
            WebhookState {
                engine,
                delivery: Arc::new(NoopDelivery),
                gates: Arc::new(UserGates::new()),
                verify_token: "secure_token".to_owned(),
            },
            store,
        )
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn handshake_echoes_the_challenge() {
        let (state, _) = state();
        let response = router(state)
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=secure_token&hub.challenge=777",
                )
                .body(Body::empty())
                .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "777");
    }

    #[tokio::test]
    async fn handshake_with_wrong_token_is_forbidden() {
        let (state, _) = state();
        let response = router(state)
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=777",
                )
                .body(Body::empty())
                .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delivery_is_acknowledged_after_resolution() {
        let (state, store) = state();
        let body = r#"{
            "object": "page",
            "entry": [{"messaging": [
                {"sender": {"id": "u1"}, "postback": {"payload": "lead"}}
            ]}]
        }"#;

        let response = router(state)
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "EVENT_RECEIVED");
        assert_eq!(
            store.get("u1").expect("flow started").category,
            FlowCategory::LeadCapture
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (state, _) = state();
        let response = router(state)
            .oneshot(
                Request::post("/webhook").body(Body::from("{not json")).expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
