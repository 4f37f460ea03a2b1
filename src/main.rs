//! StoryBooks binary entry point

use std::time::Duration;

use storybooks::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (session purge)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let default_filter = format!("storybooks={},tower_http=debug", config.logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(
        mode = ?config.server.mode,
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Starting StoryBooks..."
    );

    storybooks::metrics::init_metrics();

    // 3. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 4. Build Axum router
    let app = storybooks::build_router(state.clone());

    // 5. Start background tasks
    spawn_session_purge_task(state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background task that deletes expired sessions
fn spawn_session_purge_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);

        loop {
            interval.tick().await;

            match state.sessions.purge_expired().await {
                Ok(0) => tracing::debug!("No expired sessions"),
                Ok(purged) => tracing::info!(purged, "Expired sessions purged"),
                Err(error) => tracing::error!(%error, "Session purge failed"),
            }
        }
    });

    tracing::info!("Session purge task spawned");
}
