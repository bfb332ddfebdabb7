// EV Flexibility Value - Web Server
// JSON API over the SQLite record store

use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

use ev_flex_value::api::{router, AppState};
use ev_flex_value::{init_tracing, AppConfig, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ev_value.toml"));
    info!(path = %config_path.display(), "Loading configuration");
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let store = SqliteStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    info!(path = %config.database.path, "Database opened");

    let app = router(AppState::new(store, config.estimation.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("EV value server listening on {addr}");
    println!("\n🚀 Server running on http://{addr}");
    println!("   API: http://{addr}/api/ev-specs");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}
