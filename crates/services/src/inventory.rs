use async_trait::async_trait;
use reqwest::Client;

use parley_core::{CollaboratorError, InventoryService, InventoryStatus};

const SERVICE: &str = "inventory";

/// Inventory collaborator over plain HTTP. One GET per lookup; the
/// response body is the product status document as-is.
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }
}

#[async_trait]
impl InventoryService for HttpInventoryClient {
    async fn product_status(&self, product_id: &str) -> Result<InventoryStatus, CollaboratorError> {
        let url = format!("{}/inventory/{product_id}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|error| {
            CollaboratorError::Unavailable { service: SERVICE, detail: error.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected { service: SERVICE, status: status.as_u16() });
        }

        response.json::<InventoryStatus>().await.map_err(|error| {
            CollaboratorError::MalformedPayload { service: SERVICE, detail: error.to_string() }
        })
    }
}
