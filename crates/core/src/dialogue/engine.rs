use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::config::BusinessProfile;
use crate::dialogue::replies::{self, Reply};
use crate::dialogue::rules::{match_token, StatelessTopic, TokenRule};
use crate::ports::{
    BookingRequest, IntakeRecord, IntakeSink, InventoryService, SchedulingService,
};
use crate::session::{next_step, FlowCategory, FlowStep, Session, SessionStore};
use crate::Platform;

const CONSULTATION_SERVICE: &str = "Chatbot Consultation";

/// Turn resolver. One call per inbound message; always produces a reply,
/// never an error. Internal failures degrade to user-facing copy and a
/// log line.
///
/// Resolution order per turn:
/// 1. global reset tokens
/// 2. stateless topics
/// 3. flow-entry tokens
/// 4. one-shot inventory checks
/// 5. stateful continuation of an active flow
/// 6. fallback
pub struct DialogueEngine {
    business: BusinessProfile,
    store: Arc<SessionStore>,
    inventory: Arc<dyn InventoryService>,
    scheduling: Arc<dyn SchedulingService>,
    sink: Arc<dyn IntakeSink>,
}

impl DialogueEngine {
    pub fn new(
        business: BusinessProfile,
        store: Arc<SessionStore>,
        inventory: Arc<dyn InventoryService>,
        scheduling: Arc<dyn SchedulingService>,
        sink: Arc<dyn IntakeSink>,
    ) -> Self {
        Self { business, store, inventory, scheduling, sink }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolves one normalized token for one user. The caller holds the
    /// user's turn gate; nothing here re-enters the engine for the same
    /// user concurrently.
    pub async fn resolve(&self, user_id: &str, token: &str, platform: Platform) -> Reply {
        // Commands match case-insensitively; collected field values keep
        // the user's original casing.
        let token = token.trim();
        match match_token(token.to_lowercase().as_str()) {
            Some(TokenRule::Global) => {
                let had_session = self.store.reset(user_id);
                info!(
                    event_name = "dialogue.reset",
                    user_id,
                    platform = platform.as_str(),
                    had_session,
                    "global reset"
                );
                replies::main_menu(&self.business)
            }
            Some(TokenRule::Stateless(topic)) => self.stateless_reply(topic),
            Some(TokenRule::FlowEntry(category)) => {
                let session = self.store.create_or_replace(user_id, category);
                info!(
                    event_name = "dialogue.flow_started",
                    user_id,
                    platform = platform.as_str(),
                    category = category.label(),
                    "flow entered"
                );
                match category {
                    FlowCategory::Scheduling => replies::schedule_date_prompt(),
                    _ => replies::prompt_for(session.step),
                }
            }
            Some(TokenRule::InventoryCheck { product_id }) => {
                self.inventory_check(user_id, &product_id).await
            }
            None => match self.store.get(user_id) {
                Some(session) => self.continue_flow(user_id, token, session, platform).await,
                None => {
                    info!(
                        event_name = "dialogue.fallback",
                        user_id,
                        platform = platform.as_str(),
                        "unrecognized token, no active session"
                    );
                    replies::fallback(&self.business)
                }
            },
        }
    }

    fn stateless_reply(&self, topic: StatelessTopic) -> Reply {
        match topic {
            StatelessTopic::Services => replies::services(),
            StatelessTopic::LearnMore => replies::learn_more(&self.business),
            StatelessTopic::Faq => replies::faq(),
            StatelessTopic::ServicesInfo => replies::services_info(),
            StatelessTopic::Cost => replies::cost(&self.business),
            StatelessTopic::Shipping => replies::shipping(&self.business),
            StatelessTopic::SupportMenu => replies::support_menu(),
            StatelessTopic::Contact => replies::contact(&self.business),
            StatelessTopic::SalesMenu => replies::sales_menu(),
            StatelessTopic::Products => replies::products(&self.business),
            StatelessTopic::Offers => replies::offers(&self.business),
            StatelessTopic::InventoryMenu => replies::inventory_menu(),
        }
    }

    /// One-shot lookup; the user's session, if any, is left untouched.
    async fn inventory_check(&self, user_id: &str, product_id: &str) -> Reply {
        match self.inventory.product_status(product_id).await {
            Ok(status) => {
                info!(
                    event_name = "dialogue.inventory_checked",
                    user_id,
                    product_id,
                    available = status.available,
                    "inventory lookup"
                );
                replies::inventory_status(
                    &status.product,
                    status.quantity,
                    status.available,
                    &status.price,
                )
            }
            Err(error) => {
                warn!(
                    event_name = "dialogue.inventory_failed",
                    user_id,
                    product_id,
                    error = %error,
                    "inventory lookup failed"
                );
                replies::inventory_unavailable()
            }
        }
    }

    async fn continue_flow(
        &self,
        user_id: &str,
        token: &str,
        session: Session,
        platform: Platform,
    ) -> Reply {
        match session.step {
            FlowStep::AwaitingDate => self.scheduling_date_turn(user_id, token).await,
            FlowStep::AwaitingTime => self.scheduling_time_turn(user_id, token, &session).await,
            step => self.intake_turn(user_id, token, &session, step, platform).await,
        }
    }

    /// Date turn of the scheduling flow. Any failure to produce slots,
    /// whether a bad date, a collaborator error, or an empty day, drops
    /// the session so the next message starts clean.
    async fn scheduling_date_turn(&self, user_id: &str, token: &str) -> Reply {
        if NaiveDate::parse_from_str(token, "%Y-%m-%d").is_err() {
            self.store.reset(user_id);
            return replies::schedule_bad_date();
        }

        match self.scheduling.available_slots(token).await {
            Ok(slots) if !slots.is_empty() => {
                let advanced = self
                    .store
                    .set_field(user_id, FlowStep::AwaitingDate.field_name(), token)
                    .and_then(|()| self.store.advance(user_id, FlowStep::AwaitingTime));
                if advanced.is_err() {
                    // Session vanished between get and mutate; only a reset
                    // on another task could do that, so start over.
                    return replies::fallback(&self.business);
                }
                info!(
                    event_name = "dialogue.slots_offered",
                    user_id,
                    date = token,
                    slot_count = slots.len(),
                    "slots offered"
                );
                replies::schedule_slots(token, &slots)
            }
            Ok(_) => {
                self.store.reset(user_id);
                replies::schedule_no_slots()
            }
            Err(error) => {
                warn!(
                    event_name = "dialogue.slots_failed",
                    user_id,
                    date = token,
                    error = %error,
                    "slot lookup failed"
                );
                self.store.reset(user_id);
                replies::schedule_bad_date()
            }
        }
    }

    /// Time turn of the scheduling flow. The session ends this turn no
    /// matter the outcome; a retry means re-entering the flow.
    async fn scheduling_time_turn(&self, user_id: &str, token: &str, session: &Session) -> Reply {
        if NaiveTime::parse_from_str(token, "%H:%M").is_err() {
            self.store.reset(user_id);
            return replies::schedule_booking_failed();
        }

        let date = session
            .fields
            .get(FlowStep::AwaitingDate.field_name())
            .cloned()
            .unwrap_or_default();
        let request = BookingRequest {
            customer_id: user_id.to_owned(),
            date,
            time: token.to_owned(),
            service: CONSULTATION_SERVICE.to_owned(),
        };

        let outcome = self.scheduling.book(&request).await;
        self.store.reset(user_id);

        match outcome {
            Ok(confirmation) => {
                info!(
                    event_name = "dialogue.booking_confirmed",
                    user_id,
                    date = %confirmation.date,
                    time = token,
                    "appointment booked"
                );
                replies::schedule_booked(&confirmation.date)
            }
            Err(error) => {
                warn!(
                    event_name = "dialogue.booking_failed",
                    user_id,
                    error = %error,
                    "booking failed"
                );
                replies::schedule_booking_failed()
            }
        }
    }

    /// One data-collection turn of an intake flow: store the raw input
    /// under the current step's field, then either prompt for the next
    /// field or flush the completed flow to the sink.
    async fn intake_turn(
        &self,
        user_id: &str,
        token: &str,
        session: &Session,
        step: FlowStep,
        platform: Platform,
    ) -> Reply {
        if self.store.set_field(user_id, step.field_name(), token).is_err() {
            return replies::fallback(&self.business);
        }

        match next_step(session.category, step) {
            Some(next) => {
                if self.store.advance(user_id, next).is_err() {
                    return replies::fallback(&self.business);
                }
                replies::prompt_for(next)
            }
            None => {
                let completed = match self.store.complete(user_id) {
                    Ok(completed) => completed,
                    Err(_) => return replies::fallback(&self.business),
                };

                let mut record = IntakeRecord::new(user_id, completed.category);
                record.fields = completed.fields;

                if let Err(error) = self.sink.append(&record).await {
                    warn!(
                        event_name = "dialogue.intake_sink_failed",
                        user_id,
                        category = record.category.label(),
                        error = %error,
                        "intake record dropped"
                    );
                } else {
                    info!(
                        event_name = "dialogue.flow_completed",
                        user_id,
                        platform = platform.as_str(),
                        category = record.category.label(),
                        "flow completed"
                    );
                }

                match record.category {
                    FlowCategory::LeadCapture => replies::lead_complete(),
                    _ => replies::intake_complete(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::DialogueEngine;
    use crate::config::AppConfig;
    use crate::ports::{
        BookingConfirmation, BookingRequest, CollaboratorError, IntakeRecord, IntakeSink,
        InventoryService, InventoryStatus, SchedulingService,
    };
    use crate::session::{FlowCategory, FlowStep, SessionStore};
    use crate::Platform;

    struct FakeInventory {
        response: Result<InventoryStatus, CollaboratorError>,
    }

    #[async_trait]
    impl InventoryService for FakeInventory {
        async fn product_status(
            &self,
            _product_id: &str,
        ) -> Result<InventoryStatus, CollaboratorError> {
            self.response.clone()
        }
    }

    struct FakeScheduling {
        slots: Result<Vec<String>, CollaboratorError>,
        booking: Result<BookingConfirmation, CollaboratorError>,
        booked: Mutex<Vec<BookingRequest>>,
    }

    impl FakeScheduling {
        fn with_slots(slots: Vec<&str>) -> Self {
            Self {
                slots: Ok(slots.into_iter().map(str::to_owned).collect()),
                booking: Ok(BookingConfirmation { date: "2026-09-01".to_owned() }),
                booked: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                slots: Err(CollaboratorError::Unavailable {
                    service: "scheduling",
                    detail: "down".to_owned(),
                }),
                booking: Err(CollaboratorError::Rejected { service: "scheduling", status: 409 }),
                booked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SchedulingService for FakeScheduling {
        async fn available_slots(&self, _date: &str) -> Result<Vec<String>, CollaboratorError> {
            self.slots.clone()
        }

        async fn book(
            &self,
            request: &BookingRequest,
        ) -> Result<BookingConfirmation, CollaboratorError> {
            self.booked.lock().await.push(request.clone());
            self.booking.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<IntakeRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl IntakeSink for RecordingSink {
        async fn append(&self, record: &IntakeRecord) -> Result<(), CollaboratorError> {
            self.records.lock().await.push(record.clone());
            if self.fail {
                Err(CollaboratorError::Unavailable {
                    service: "sheets",
                    detail: "quota".to_owned(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        engine: DialogueEngine,
        store: Arc<SessionStore>,
        scheduling: Arc<FakeScheduling>,
        sink: Arc<RecordingSink>,
    }

    fn harness(
        inventory: FakeInventory,
        scheduling: FakeScheduling,
        sink: RecordingSink,
    ) -> Harness {
        let store = Arc::new(SessionStore::new());
        let scheduling = Arc::new(scheduling);
        let sink = Arc::new(sink);
        let engine = DialogueEngine::new(
            AppConfig::default().business,
            Arc::clone(&store),
            Arc::new(inventory),
            Arc::clone(&scheduling) as Arc<dyn SchedulingService>,
            Arc::clone(&sink) as Arc<dyn IntakeSink>,
        );
        Harness { engine, store, scheduling, sink }
    }

    fn default_harness() -> Harness {
        harness(
            FakeInventory {
                response: Ok(InventoryStatus {
                    product: "Basic Chatbot".to_owned(),
                    quantity: 7,
                    available: true,
                    price: "$99".to_owned(),
                }),
            },
            FakeScheduling::with_slots(vec!["10:00", "14:00"]),
            RecordingSink::default(),
        )
    }

    #[tokio::test]
    async fn reset_is_idempotent_and_always_shows_menu() {
        let h = default_harness();
        h.store.create_or_replace("u1", FlowCategory::OrderIssue);

        let first = h.engine.resolve("u1", "start", Platform::Meta).await;
        let second = h.engine.resolve("u1", "start", Platform::Meta).await;

        assert_eq!(first, second);
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn global_reset_beats_an_active_flow() {
        let h = default_harness();
        h.engine.resolve("u1", "lead", Platform::Meta).await;
        h.engine.resolve("u1", "Ada", Platform::Meta).await;

        let reply = h.engine.resolve("u1", " Hi ", Platform::Meta).await;

        assert!(reply.text.contains("Welcome"));
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn lead_flow_flushes_one_record_with_every_field() {
        let h = default_harness();
        for token in ["lead", "Ada Lovelace", "ada@example.com", "555-0100", "Analytical Engines"] {
            h.engine.resolve("u1", token, Platform::Meta).await;
        }
        let reply = h.engine.resolve("u1", "engines.example", Platform::Meta).await;

        assert!(reply.text.contains("reach out soon"));
        assert!(h.store.get("u1").is_none(), "completed flow must delete the session");

        let records = h.sink.records.lock().await;
        assert_eq!(records.len(), 1, "exactly one sink write per completed flow");
        let record = &records[0];
        assert_eq!(record.category, FlowCategory::LeadCapture);
        assert_eq!(record.field("name"), "Ada Lovelace");
        assert_eq!(record.field("email"), "ada@example.com");
        assert_eq!(record.field("phone"), "555-0100");
        assert_eq!(record.field("business_name"), "Analytical Engines");
        assert_eq!(record.field("website"), "engines.example");
    }

    #[tokio::test]
    async fn order_issue_flow_walks_its_full_sequence() {
        let h = default_harness();
        let entry = h.engine.resolve("u1", "order_issue", Platform::Meta).await;
        assert!(entry.text.contains("order number"));

        for token in ["ORD-42", "Ada", "ada@example.com", "555-0100", "urgent", "Engines Ltd"] {
            h.engine.resolve("u1", token, Platform::Meta).await;
        }
        let done = h.engine.resolve("u1", "engines.example", Platform::Meta).await;

        assert!(done.text.contains("follow up soon"));
        let records = h.sink.records.lock().await;
        assert_eq!(records[0].field("order_number"), "ORD-42");
        assert_eq!(records[0].field("urgency"), "urgent");
    }

    #[tokio::test]
    async fn abandoned_flow_writes_nothing() {
        let h = default_harness();
        h.engine.resolve("u1", "tech_issue", Platform::Meta).await;
        h.engine.resolve("u1", "Ada", Platform::Meta).await;
        h.engine.resolve("u1", "start", Platform::Meta).await;

        assert!(h.sink.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed_and_session_still_ends() {
        let h = harness(
            FakeInventory {
                response: Err(CollaboratorError::Unavailable {
                    service: "inventory",
                    detail: "down".to_owned(),
                }),
            },
            FakeScheduling::failing(),
            RecordingSink { fail: true, ..RecordingSink::default() },
        );
        for token in ["lead", "Ada", "ada@example.com", "555-0100", "Engines Ltd"] {
            h.engine.resolve("u1", token, Platform::Meta).await;
        }
        let reply = h.engine.resolve("u1", "engines.example", Platform::Meta).await;

        assert!(reply.text.contains("reach out soon"), "user still gets the completion reply");
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn inventory_check_reports_stock_and_leaves_sessions_alone() {
        let h = default_harness();
        h.engine.resolve("u1", "lead", Platform::Meta).await;

        let reply = h.engine.resolve("u1", "check_basic", Platform::Meta).await;

        assert!(reply.text.contains("in stock"));
        assert_eq!(
            h.store.get("u1").expect("session survives one-shot lookup").step,
            FlowStep::Name
        );
    }

    #[tokio::test]
    async fn inventory_failure_degrades_to_copy() {
        let h = harness(
            FakeInventory {
                response: Err(CollaboratorError::Rejected { service: "inventory", status: 404 }),
            },
            FakeScheduling::with_slots(vec!["10:00"]),
            RecordingSink::default(),
        );

        let reply = h.engine.resolve("u1", "check_ghost", Platform::Meta).await;
        assert!(reply.text.contains("couldn't check inventory"));
    }

    #[tokio::test]
    async fn scheduling_happy_path_books_and_ends_the_session() {
        let h = default_harness();
        h.engine.resolve("u1", "schedule", Platform::Meta).await;

        let slots = h.engine.resolve("u1", "2026-09-01", Platform::Meta).await;
        assert!(slots.text.contains("10:00, 14:00"));
        assert_eq!(h.store.get("u1").expect("mid-flow").step, FlowStep::AwaitingTime);

        let booked = h.engine.resolve("u1", "10:00", Platform::Meta).await;
        assert!(booked.text.contains("booked for 2026-09-01"));
        assert!(h.store.get("u1").is_none());

        let requests = h.scheduling.booked.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].date, "2026-09-01");
        assert_eq!(requests[0].time, "10:00");
        assert_eq!(requests[0].service, "Chatbot Consultation");
    }

    #[tokio::test]
    async fn malformed_date_drops_the_session() {
        let h = default_harness();
        h.engine.resolve("u1", "schedule", Platform::Meta).await;

        let reply = h.engine.resolve("u1", "next tuesday", Platform::Meta).await;

        assert!(reply.text.contains("YYYY-MM-DD"));
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn empty_slot_day_drops_the_session() {
        let h = harness(
            FakeInventory {
                response: Err(CollaboratorError::Unavailable {
                    service: "inventory",
                    detail: "down".to_owned(),
                }),
            },
            FakeScheduling::with_slots(vec![]),
            RecordingSink::default(),
        );
        h.engine.resolve("u1", "schedule", Platform::Meta).await;

        let reply = h.engine.resolve("u1", "2026-09-01", Platform::Meta).await;

        assert!(reply.text.contains("No slots"));
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn slot_lookup_failure_drops_the_session() {
        let h = harness(
            FakeInventory {
                response: Err(CollaboratorError::Unavailable {
                    service: "inventory",
                    detail: "down".to_owned(),
                }),
            },
            FakeScheduling::failing(),
            RecordingSink::default(),
        );
        h.engine.resolve("u1", "schedule", Platform::Meta).await;

        let reply = h.engine.resolve("u1", "2026-09-01", Platform::Meta).await;

        assert!(reply.text.contains("Invalid date or error"));
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn booking_rejection_drops_the_session() {
        let h = harness(
            FakeInventory {
                response: Err(CollaboratorError::Unavailable {
                    service: "inventory",
                    detail: "down".to_owned(),
                }),
            },
            FakeScheduling {
                slots: Ok(vec!["10:00".to_owned()]),
                booking: Err(CollaboratorError::Rejected { service: "scheduling", status: 409 }),
                booked: Mutex::new(Vec::new()),
            },
            RecordingSink::default(),
        );
        h.engine.resolve("u1", "schedule", Platform::Meta).await;
        h.engine.resolve("u1", "2026-09-01", Platform::Meta).await;

        let reply = h.engine.resolve("u1", "10:00", Platform::Meta).await;

        assert!(reply.text.contains("Couldn't book"));
        assert!(h.store.get("u1").is_none());
    }

    #[tokio::test]
    async fn unrecognized_token_without_session_falls_back() {
        let h = default_harness();
        let reply = h.engine.resolve("u1", "what is the meaning of life", Platform::Meta).await;
        assert!(reply.text.contains("didn't understand"));
        assert!(!reply.choices.is_empty());
    }

    #[tokio::test]
    async fn concurrent_flows_for_distinct_users_stay_isolated() {
        let h = default_harness();
        h.engine.resolve("alice", "lead", Platform::Meta).await;
        h.engine.resolve("bob", "order_issue", Platform::WeChat).await;
        h.engine.resolve("alice", "Alice", Platform::Meta).await;
        h.engine.resolve("bob", "ORD-7", Platform::WeChat).await;

        let alice = h.store.get("alice").expect("alice session");
        let bob = h.store.get("bob").expect("bob session");
        assert_eq!(alice.category, FlowCategory::LeadCapture);
        assert_eq!(alice.fields.get("name").map(String::as_str), Some("Alice"));
        assert_eq!(bob.category, FlowCategory::OrderIssue);
        assert_eq!(bob.fields.get("order_number").map(String::as_str), Some("ORD-7"));
    }
}
