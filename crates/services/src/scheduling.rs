use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use parley_core::{BookingConfirmation, BookingRequest, CollaboratorError, SchedulingService};

const SERVICE: &str = "scheduling";

/// Scheduling collaborator over plain HTTP. Slot listing is a GET per
/// date; booking is a POST that must answer 201 with the confirmed
/// appointment details.
pub struct HttpSchedulingClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SlotsResponse {
    #[serde(default)]
    available_slots: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BookingResponse {
    details: BookingConfirmation,
}

impl HttpSchedulingClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }
}

#[async_trait]
impl SchedulingService for HttpSchedulingClient {
    async fn available_slots(&self, date: &str) -> Result<Vec<String>, CollaboratorError> {
        let url = format!("{}/scheduling/available/{date}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|error| {
            CollaboratorError::Unavailable { service: SERVICE, detail: error.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected { service: SERVICE, status: status.as_u16() });
        }

        let slots: SlotsResponse = response.json().await.map_err(|error| {
            CollaboratorError::MalformedPayload { service: SERVICE, detail: error.to_string() }
        })?;
        Ok(slots.available_slots)
    }

    async fn book(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, CollaboratorError> {
        let url = format!("{}/scheduling", self.base_url);
        let response = self.client.post(&url).json(request).send().await.map_err(|error| {
            CollaboratorError::Unavailable { service: SERVICE, detail: error.to_string() }
        })?;

        // Anything but 201 means the slot was not taken, including 200s
        // from proxies that swallowed the real answer.
        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(CollaboratorError::Rejected { service: SERVICE, status: status.as_u16() });
        }

        let booking: BookingResponse = response.json().await.map_err(|error| {
            CollaboratorError::MalformedPayload { service: SERVICE, detail: error.to_string() }
        })?;
        Ok(booking.details)
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Json as JsonBody, Path},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::HttpSchedulingClient;
    use parley_core::{BookingRequest, CollaboratorError, SchedulingService};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{address}")
    }

    fn booking() -> BookingRequest {
        BookingRequest {
            customer_id: "u1".to_owned(),
            date: "2026-09-01".to_owned(),
            time: "10:00".to_owned(),
            service: "Chatbot Consultation".to_owned(),
        }
    }

    #[tokio::test]
    async fn slot_listing_decodes_available_slots() {
        let router = Router::new().route(
            "/scheduling/available/{date}",
            get(|Path(date): Path<String>| async move {
                assert_eq!(date, "2026-09-01");
                Json(json!({ "available_slots": ["10:00", "14:00"] }))
            }),
        );
        let base = serve(router).await;

        let client = HttpSchedulingClient::new(reqwest::Client::new(), &base);
        let slots = client.available_slots("2026-09-01").await.expect("slots");

        assert_eq!(slots, vec!["10:00".to_owned(), "14:00".to_owned()]);
    }

    #[tokio::test]
    async fn booking_requires_a_created_status() {
        let router = Router::new().route(
            "/scheduling",
            post(|JsonBody(body): JsonBody<Value>| async move {
                assert_eq!(body["customer_id"], "u1");
                assert_eq!(body["service"], "Chatbot Consultation");
                (StatusCode::CREATED, Json(json!({ "details": { "date": "2026-09-01" } })))
            }),
        );
        let base = serve(router).await;

        let client = HttpSchedulingClient::new(reqwest::Client::new(), &base);
        let confirmation = client.book(&booking()).await.expect("booked");

        assert_eq!(confirmation.date, "2026-09-01");
    }

    #[tokio::test]
    async fn booking_conflict_is_a_rejection() {
        let router =
            Router::new().route("/scheduling", post(|| async { StatusCode::CONFLICT }));
        let base = serve(router).await;

        let client = HttpSchedulingClient::new(reqwest::Client::new(), &base);
        let error = client.book(&booking()).await.expect_err("conflict must fail");

        assert_eq!(error, CollaboratorError::Rejected { service: "scheduling", status: 409 });
    }

    #[tokio::test]
    async fn ok_without_created_is_still_a_rejection() {
        let router = Router::new()
            .route("/scheduling", post(|| async { Json(json!({ "details": { "date": "x" } })) }));
        let base = serve(router).await;

        let client = HttpSchedulingClient::new(reqwest::Client::new(), &base);
        let error = client.book(&booking()).await.expect_err("200 must fail");

        assert_eq!(error, CollaboratorError::Rejected { service: "scheduling", status: 200 });
    }
}
