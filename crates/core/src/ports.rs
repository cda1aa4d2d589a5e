use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::FlowCategory;

/// A collaborator call that could not produce a usable answer. Callers
/// degrade these to user-visible replies; they never propagate out of a
/// turn.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{service} collaborator unavailable: {detail}")]
    Unavailable { service: &'static str, detail: String },
    #[error("{service} collaborator returned status {status}")]
    Rejected { service: &'static str, status: u16 },
    #[error("{service} collaborator returned a malformed payload: {detail}")]
    MalformedPayload { service: &'static str, detail: String },
}

/// Inventory lookup result for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub product: String,
    pub quantity: i64,
    pub available: bool,
    pub price: String,
}

#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn product_status(&self, product_id: &str) -> Result<InventoryStatus, CollaboratorError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    pub customer_id: String,
    pub date: String,
    pub time: String,
    pub service: String,
}

/// Confirmed booking; `date` is the collaborator's canonical form and is
/// what the confirmation reply echoes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BookingConfirmation {
    pub date: String,
}

#[async_trait]
pub trait SchedulingService: Send + Sync {
    async fn available_slots(&self, date: &str) -> Result<Vec<String>, CollaboratorError>;
    async fn book(&self, request: &BookingRequest)
        -> Result<BookingConfirmation, CollaboratorError>;
}

/// One completed flow's worth of collected fields, flushed exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeRecord {
    pub user_id: String,
    pub category: FlowCategory,
    pub fields: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl IntakeRecord {
    pub fn new(user_id: impl Into<String>, category: FlowCategory) -> Self {
        Self {
            user_id: user_id.into(),
            category,
            fields: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Missing optional trailing fields read as empty strings so sink rows
    /// always have a full column set.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Append-only sink for completed intake flows. Failures are logged by
/// the caller and never surfaced to the user or retried.
#[async_trait]
pub trait IntakeSink: Send + Sync {
    async fn append(&self, record: &IntakeRecord) -> Result<(), CollaboratorError>;
}

/// Stand-ins for deployments where a collaborator is not configured.
/// Lookups report the service unavailable; sink appends are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInventoryService;

#[async_trait]
impl InventoryService for NoopInventoryService {
    async fn product_status(
        &self,
        _product_id: &str,
    ) -> Result<InventoryStatus, CollaboratorError> {
        Err(CollaboratorError::Unavailable {
            service: "inventory",
            detail: "inventory collaborator not configured".to_owned(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSchedulingService;

#[async_trait]
impl SchedulingService for NoopSchedulingService {
    async fn available_slots(&self, _date: &str) -> Result<Vec<String>, CollaboratorError> {
        Err(CollaboratorError::Unavailable {
            service: "scheduling",
            detail: "scheduling collaborator not configured".to_owned(),
        })
    }

    async fn book(
        &self,
        _request: &BookingRequest,
    ) -> Result<BookingConfirmation, CollaboratorError> {
        Err(CollaboratorError::Unavailable {
            service: "scheduling",
            detail: "scheduling collaborator not configured".to_owned(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopIntakeSink;

#[async_trait]
impl IntakeSink for NoopIntakeSink {
    async fn append(&self, _record: &IntakeRecord) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CollaboratorError, IntakeRecord, IntakeSink, InventoryService, NoopIntakeSink,
        NoopInventoryService,
    };
    use crate::session::FlowCategory;

    #[tokio::test]
    async fn noop_inventory_reports_unavailable() {
        let error = NoopInventoryService
            .product_status("basic")
            .await
            .expect_err("noop lookup must not succeed");
        assert!(matches!(error, CollaboratorError::Unavailable { service: "inventory", .. }));
    }

    #[tokio::test]
    async fn noop_sink_accepts_and_drops_records() {
        let record = IntakeRecord::new("u1", FlowCategory::LeadCapture);
        NoopIntakeSink.append(&record).await.expect("noop append always succeeds");
    }

    #[test]
    fn missing_fields_read_as_empty_strings() {
        let record = IntakeRecord::new("u1", FlowCategory::OrderIssue);
        assert_eq!(record.field("phone"), "");
    }
}
