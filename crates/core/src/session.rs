use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which top-level flow owns a session. The label is the category column
/// written to the intake sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowCategory {
    OrderIssue,
    TechnicalIssue,
    LeadCapture,
    Scheduling,
}

impl FlowCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OrderIssue => "Order Issue",
            Self::TechnicalIssue => "Technical Issue",
            Self::LeadCapture => "Lead Capture",
            Self::Scheduling => "Scheduling",
        }
    }
}

/// The point a session has reached inside its flow. A session at a final
/// step is completed and deleted in the same turn; no session ever rests
/// at a "done" step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStep {
    OrderNumber,
    Name,
    Email,
    Phone,
    Urgency,
    BusinessName,
    Website,
    IssueDescription,
    AwaitingDate,
    AwaitingTime,
}

impl FlowStep {
    /// Field name the raw input for this step is stored under. Matches the
    /// intake sink column names.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::OrderNumber => "order_number",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Urgency => "urgency",
            Self::BusinessName => "business_name",
            Self::Website => "website",
            Self::IssueDescription => "issue_description",
            Self::AwaitingDate => "schedule_date",
            Self::AwaitingTime => "schedule_time",
        }
    }
}

/// Entry step for each flow.
pub fn first_step(category: FlowCategory) -> FlowStep {
    match category {
        FlowCategory::OrderIssue => FlowStep::OrderNumber,
        FlowCategory::TechnicalIssue | FlowCategory::LeadCapture => FlowStep::Name,
        FlowCategory::Scheduling => FlowStep::AwaitingDate,
    }
}

/// Field-collection sequence per flow. `None` marks the final step: the
/// turn that reaches it stores its field, flushes the session to the
/// intake sink, and deletes it.
pub fn next_step(category: FlowCategory, current: FlowStep) -> Option<FlowStep> {
    use FlowCategory::{LeadCapture, OrderIssue, Scheduling, TechnicalIssue};
    use FlowStep::{
        AwaitingDate, AwaitingTime, BusinessName, Email, IssueDescription, Name, OrderNumber,
        Phone, Urgency, Website,
    };

    match (category, current) {
        (OrderIssue, OrderNumber) => Some(Name),
        (OrderIssue, Name) => Some(Email),
        (OrderIssue, Email) => Some(Phone),
        (OrderIssue, Phone) => Some(Urgency),
        (OrderIssue, Urgency) => Some(BusinessName),
        (OrderIssue, BusinessName) => Some(Website),
        (OrderIssue, Website) => None,

        (TechnicalIssue, Name) => Some(Email),
        (TechnicalIssue, Email) => Some(Phone),
        (TechnicalIssue, Phone) => Some(Urgency),
        (TechnicalIssue, Urgency) => Some(BusinessName),
        (TechnicalIssue, BusinessName) => Some(Website),
        (TechnicalIssue, Website) => Some(IssueDescription),
        (TechnicalIssue, IssueDescription) => None,

        (LeadCapture, Name) => Some(Email),
        (LeadCapture, Email) => Some(Phone),
        (LeadCapture, Phone) => Some(BusinessName),
        (LeadCapture, BusinessName) => Some(Website),
        (LeadCapture, Website) => None,

        (Scheduling, AwaitingDate) => Some(AwaitingTime),
        (Scheduling, AwaitingTime) => None,

        // A session only ever holds steps reachable from its own entry
        // step; any other pairing is a store invariant violation.
        _ => None,
    }
}

/// Per-user record of an in-progress multi-turn flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub category: FlowCategory,
    pub step: FlowStep,
    pub fields: BTreeMap<String, String>,
}

/// Field set handed to the intake sink when a flow completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedFlow {
    pub user_id: String,
    pub category: FlowCategory,
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active session for user `{user_id}`")]
    NoActiveSession { user_id: String },
}

/// Owns the `user_id -> Session` map. Every operation takes the inner
/// lock for the duration of one map access only; nothing network-bound
/// ever runs under it. Ordering of whole turns for a single user is the
/// caller's job, via [`UserGates`].
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the user's session, if one exists. Never creates.
    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.lock().get(user_id).cloned()
    }

    /// Starts a flow, silently discarding any prior incomplete session.
    /// Global commands and flow-entry tokens always win over a flow in
    /// progress.
    pub fn create_or_replace(&self, user_id: &str, category: FlowCategory) -> Session {
        let session = Session {
            user_id: user_id.to_owned(),
            category,
            step: first_step(category),
            fields: BTreeMap::new(),
        };
        self.lock().insert(user_id.to_owned(), session.clone());
        session
    }

    pub fn set_field(
        &self,
        user_id: &str,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let session = inner
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NoActiveSession { user_id: user_id.to_owned() })?;
        session.fields.insert(field.to_owned(), value.into());
        Ok(())
    }

    /// Moves the session to `step`, leaving collected fields untouched.
    pub fn advance(&self, user_id: &str, step: FlowStep) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let session = inner
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NoActiveSession { user_id: user_id.to_owned() })?;
        session.step = step;
        Ok(())
    }

    /// Returns the full field set and deletes the session in one lock
    /// acquisition. Called exactly once per flow, at its final
    /// data-collection turn.
    pub fn complete(&self, user_id: &str) -> Result<CompletedFlow, SessionError> {
        let session = self
            .lock()
            .remove(user_id)
            .ok_or_else(|| SessionError::NoActiveSession { user_id: user_id.to_owned() })?;
        Ok(CompletedFlow {
            user_id: session.user_id,
            category: session.category,
            fields: session.fields,
        })
    }

    /// Deletes the session unconditionally. Returns whether one existed.
    pub fn reset(&self, user_id: &str) -> bool {
        self.lock().remove(user_id).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // Store operations never hold the lock across await points, so a
        // poisoned lock can only follow a panic inside a plain map access.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Per-user turn serialization. Two webhook deliveries for the same user
/// must observe each other's session mutations in order; deliveries for
/// distinct users run fully in parallel. The handle is an async mutex so
/// it may be held across the turn's collaborator calls without blocking
/// unrelated users.
#[derive(Debug, Default)]
pub struct UserGates {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the user's gate, created on first use. The caller locks
    /// the returned mutex for the duration of the turn.
    pub fn gate(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(inner.entry(user_id.to_owned()).or_default())
    }
}
