use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use parley_channels::{GraphApiDelivery, MessageDelivery, NoopDelivery};
use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use parley_core::ports::{IntakeSink, NoopIntakeSink};
use parley_core::{DialogueEngine, SessionStore, UserGates};
use parley_services::{HttpInventoryClient, HttpSchedulingClient, SheetsIntakeSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    Noop,
    Graph,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Graph => "graph",
        }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub engine: Arc<DialogueEngine>,
    pub delivery: Arc<dyn MessageDelivery>,
    pub delivery_mode: DeliveryMode,
    pub gates: Arc<UserGates>,
    pub store: Arc<SessionStore>,
    pub sheet_sink_live: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the engine to live collaborators where credentials exist and
/// noop stand-ins where they do not. Only a missing or invalid config
/// is fatal; absent collaborators degrade per turn instead.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.collaborators.request_timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let inventory = Arc::new(HttpInventoryClient::new(
        client.clone(),
        config.collaborators.inventory_url.clone(),
    ));
    let scheduling = Arc::new(HttpSchedulingClient::new(
        client.clone(),
        config.collaborators.scheduling_url.clone(),
    ));

    let sheet_token = config.sheet.api_token.clone().filter(|_| config.sheet.enabled);
    let sheet_sink_live = sheet_token.is_some();
    let sink: Arc<dyn IntakeSink> = match sheet_token {
        Some(api_token) => Arc::new(SheetsIntakeSink::new(
            client.clone(),
            config.sheet.spreadsheet_id.clone(),
            config.sheet.sheet_name.clone(),
            api_token,
        )),
        None => Arc::new(NoopIntakeSink),
    };

    let (delivery, delivery_mode): (Arc<dyn MessageDelivery>, DeliveryMode) =
        match config.messenger.page_token.clone() {
            Some(page_token) => {
                (Arc::new(GraphApiDelivery::new(client, page_token)), DeliveryMode::Graph)
            }
            None => (Arc::new(NoopDelivery), DeliveryMode::Noop),
        };

    let store = Arc::new(SessionStore::new());
    let engine = Arc::new(DialogueEngine::new(
        config.business.clone(),
        Arc::clone(&store),
        inventory,
        scheduling,
        sink,
    ));

    info!(
        event_name = "system.bootstrap.wired",
        delivery_mode = delivery_mode.as_str(),
        sheet_sink = if sheet_sink_live { "sheets" } else { "noop" },
        inventory_url = %config.collaborators.inventory_url,
        scheduling_url = %config.collaborators.scheduling_url,
        "collaborators wired"
    );

    Ok(Application {
        config,
        engine,
        delivery,
        delivery_mode,
        gates: Arc::new(UserGates::new()),
        store,
        sheet_sink_live,
    })
}
