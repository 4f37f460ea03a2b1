//! StoryBooks - server-rendered story sharing with Google sign-in
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Session loading and access gates                         │
//! │  - Login, dashboard and story pages                         │
//! │  - Google OAuth callback                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      View Layer                              │
//! │  - minijinja templates and helpers                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): users, stories, sessions                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `routes`: Page handlers
//! - `auth`: Google OAuth, sessions and access gates
//! - `views`: Template rendering
//! - `data`: Database and story store
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus counters

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod views;

use std::sync::Arc;

use auth::{GoogleIdentityProvider, IdentityProvider, SessionManager};
use data::{Database, StoryStore};
use views::Views;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<Database>,

    /// Story persistence
    pub stories: Arc<dyn StoryStore>,

    /// Server-side sessions
    pub sessions: Arc<SessionManager>,

    /// Compiled templates
    pub views: Arc<Views>,

    /// External sign-in provider (Google)
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Compile templates
    /// 3. Build the Google identity provider
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(Database::connect(&config.database.path).await?);

        let sessions = SessionManager::new(
            db.clone(),
            config.auth.session_secret.clone(),
            config.auth.session_max_age,
        );

        // 2. Compile templates
        let views = Views::new()?;

        // 3. Initialize identity provider
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("StoryBooks/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let identity_provider = GoogleIdentityProvider::new(
            &config.auth.google,
            config.google_callback_url(),
            http_client,
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            stories: db.clone(),
            db,
            sessions: Arc::new(sessions),
            views: Arc::new(views),
            identity_provider: Arc::new(identity_provider),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware, routing::get};
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let router = Router::new()
        .merge(routes::index_router())
        .merge(routes::stories_router())
        .merge(auth::auth_router())
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(&state.config.server.public_dir))
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::load_session,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            views::render_error_pages,
        ))
        .layer(CompressionLayer::new());

    let router = if state.config.server.mode == config::RunMode::Dev {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state).merge(routes::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
