mod bootstrap;
mod health;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parley_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use parley_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = webhook::router(webhook::WebhookState {
        engine: Arc::clone(&app.engine),
        delivery: Arc::clone(&app.delivery),
        gates: Arc::clone(&app.gates),
        verify_token: app.config.messenger.verify_token.clone(),
    })
    .merge(health::router(health::HealthState {
        store: Arc::clone(&app.store),
        delivery_mode: app.delivery_mode,
        sheet_sink_live: app.sheet_sink_live,
        inventory_url: app.config.collaborators.inventory_url.clone(),
        scheduling_url: app.config.collaborators.scheduling_url.clone(),
    }));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        delivery_mode = app.delivery_mode.as_str(),
        "parley-server started"
    );

    let shutdown_grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(
                event_name = "system.server.stopping",
                "shutdown signal received, draining in-flight turns"
            );
            let _ = shutdown_tx.send(true);
        }
    });

    let mut drain_deadline = shutdown_rx.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
    });

    // In-flight webhook handlers get the grace window after the signal;
    // past it the serve future is dropped and remaining turns are cut.
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = drain_deadline.changed().await;
            tokio::time::sleep(shutdown_grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = shutdown_grace.as_secs(),
                "in-flight turns exceeded the grace window"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", "parley-server stopped");
    Ok(())
}
