//! Outreach Tracker - open and click tracking server.
//!
//! This binary provides the network-facing side of the engine:
//! - Serves the open-tracking pixel
//! - Records link clicks and redirects to the configured destination
//! - Accepts the interest form and notifies the campaign operator
//!
//! Every request is a short store transaction; nothing is cached between requests.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use outreach::notify::LogNotifier;
use outreach::shutdown::shutdown_signal;
use outreach::web::{router, AppState};
use outreach::{CampaignRegistry, Config, Notifier, SmtpNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("tracker_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        campaigns_path = %config.campaigns_path.display(),
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        smtp_configured = config.smtp_password.is_some(),
        "config_loaded"
    );

    let registry = CampaignRegistry::load(&config.campaigns_path, config.store_timeout)
        .context("Failed to load campaign file")?;
    info!(campaigns = registry.names().count(), "campaign_registry_loaded");

    let notifier: Arc<dyn Notifier> = match &config.smtp_password {
        Some(password) => Arc::new(
            SmtpNotifier::new(&registry, password).context("Failed to build SMTP notifier")?,
        ),
        None => {
            warn!("smtp_password_missing_notifications_disabled");
            Arc::new(LogNotifier)
        }
    };

    let app = router(AppState::new(registry, notifier));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "tracker_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("tracker_shutting_down");
        })
        .await
        .context("Server error")?;

    info!("tracker_shutdown_complete");

    Ok(())
}
