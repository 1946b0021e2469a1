//! # Wayzer Relay
//!
//! Real-time chat notification relay for the Wayzer trip planner.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Optional Redis fan-out
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use wayzer_relay::config::Settings;
use wayzer_relay::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    wayzer_relay::telemetry::init_tracing();

    info!("Starting Wayzer relay...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        redis = settings.redis.url.is_some(),
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
