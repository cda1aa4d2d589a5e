use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use parley_core::SessionStore;

use crate::bootstrap::DeliveryMode;

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<SessionStore>,
    pub delivery_mode: DeliveryMode,
    pub sheet_sink_live: bool,
    pub inventory_url: String,
    pub scheduling_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub delivery_mode: &'static str,
    pub intake_sink: &'static str,
    pub inventory_url: String,
    pub scheduling_url: String,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// The process is ready once bootstrap finished; collaborators degrade
/// per turn and never flip readiness. The payload reports which edges
/// run live so a deploy can be sanity-checked at a glance.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        delivery_mode: state.delivery_mode.as_str(),
        intake_sink: if state.sheet_sink_live { "sheets" } else { "noop" },
        inventory_url: state.inventory_url.clone(),
        scheduling_url: state.scheduling_url.clone(),
        active_sessions: state.store.active_sessions(),
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}
