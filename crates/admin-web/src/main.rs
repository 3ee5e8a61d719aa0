//! Read-only JSON admin service for the Kidoo database.
//!
//! Exposes health, statistics and device/tag lookups over HTTP.

mod config;
mod error;
mod routes;
mod state;
mod telemetry;

use kidoo_database::Database;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;
    telemetry::init_tracing(config.log_json);
    info!(addr = %config.addr, "Starting admin server");

    // Connect to database
    let db = Database::connect_with_pool_size(&config.database_url, config.pool_size).await?;
    db.migrate().await?;

    // Build router
    let app = routes::router().with_state(AppState::new(db.clone()));

    // Start server
    info!(addr = %config.addr, "Admin server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    db.close().await;
    Ok(())
}
