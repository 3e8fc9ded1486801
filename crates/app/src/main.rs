//! Bookline - appointment slot-booking service
//!
//! Serves the booking query surface over the length-prefixed JSON
//! protocol and pushes lifecycle notifications to Telegram.

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod notifier;
mod service;
mod state;
mod validation;

use bookline_core::AppConfig;
use bookline_net::Server;
use service::BookingService;
use state::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Bookline");

    // Optional config path as the single CLI argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let listen_port = config.listen_port;
    let notifier = notifier::spawn(&config.telegram);

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let service = Arc::new(BookingService::new(state, notifier));

    let server = match Server::start(listen_port, service).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %server.addr(), "Ready for bookings");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    tracing::info!("Shutting down");
    server.shutdown();
}
