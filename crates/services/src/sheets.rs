use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use parley_core::{CollaboratorError, IntakeRecord, IntakeSink};

const SERVICE: &str = "sheets";

/// Appends completed intake records as rows of a Google Sheet via the
/// `values.append` REST call. Column layout is fixed:
/// Sender ID, Category, User Name, Order Number, Urgency, Website,
/// Issue Description, Email, Phone, Company, Timestamp.
pub struct SheetsIntakeSink {
    client: Client,
    spreadsheet_id: String,
    sheet_name: String,
    api_token: SecretString,
}

impl SheetsIntakeSink {
    pub fn new(
        client: Client,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        api_token: SecretString,
    ) -> Self {
        Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            api_token,
        }
    }

    fn append_url(&self) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}!A1:append",
            self.spreadsheet_id, self.sheet_name
        )
    }

    fn row(record: &IntakeRecord) -> Vec<String> {
        vec![
            record.user_id.clone(),
            record.category.label().to_owned(),
            record.field("name").to_owned(),
            record.field("order_number").to_owned(),
            record.field("urgency").to_owned(),
            record.field("website").to_owned(),
            record.field("issue_description").to_owned(),
            record.field("email").to_owned(),
            record.field("phone").to_owned(),
            record.field("business_name").to_owned(),
            record.recorded_at.to_rfc3339(),
        ]
    }
}

#[async_trait]
impl IntakeSink for SheetsIntakeSink {
    async fn append(&self, record: &IntakeRecord) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .post(self.append_url())
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(self.api_token.expose_secret())
            .json(&json!({ "values": [Self::row(record)] }))
            .send()
            .await
            .map_err(|error| CollaboratorError::Unavailable {
                service: SERVICE,
                detail: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected { service: SERVICE, status: status.as_u16() });
        }

        debug!(
            event_name = "sheets.row_appended",
            user_id = %record.user_id,
            category = record.category.label(),
            "intake row appended"
        );
        Ok(())
    }
}
