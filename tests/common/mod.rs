//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::async_trait;
use storybooks::auth::{IdentityProvider, SESSION_COOKIE};
use storybooks::data::{
    Database, ProviderProfile, PublicStory, Story, StoryDraft, StoryStatus, StoryStore, User,
};
use storybooks::error::AppError;
use storybooks::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a fresh database
    pub async fn new() -> Self {
        Self::start(|_| {}).await
    }

    /// Create a test server, letting the caller swap collaborators
    /// (story store, identity provider) before the router is built
    pub async fn start(customize: impl FnOnce(&mut AppState)) -> Self {
        // Create temporary directory for test database and static files
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let public_dir = temp_dir.path().join("public");
        std::fs::create_dir_all(public_dir.join("css")).unwrap();
        std::fs::write(public_dir.join("css/style.css"), "body { margin: 0; }").unwrap();

        let config = test_config(db_path, public_dir);

        // Initialize app state
        let mut state = AppState::new(config).await.unwrap();
        state.identity_provider = Arc::new(FakeIdentityProvider::new(test_profile()));
        customize(&mut state);

        // Redirects are part of what we assert on
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = storybooks::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET as a guest
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// GET with a session cookie
    pub async fn get_as(&self, path: &str, cookie: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await
            .unwrap()
    }

    /// POST a form with a session cookie
    pub async fn post_form_as(
        &self,
        path: &str,
        cookie: &str,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Create a user as if they had signed in with Google once
    pub async fn create_user(&self, google_id: &str, first_name: &str) -> User {
        let profile = ProviderProfile {
            provider_id: google_id.to_string(),
            display_name: format!("{first_name} Tester"),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            image: None,
        };
        self.state.db.find_or_create_user(&profile).await.unwrap()
    }

    /// Create a session for `user_id` and return a `Cookie` header value
    pub async fn login(&self, user_id: &str) -> String {
        let token = self.state.sessions.create(user_id).await.unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    /// Insert a story owned by `user_id` directly into the store
    pub async fn create_story(&self, user_id: &str, title: &str, status: StoryStatus) -> Story {
        let draft = StoryDraft {
            title: title.to_string(),
            body: format!("<p>{title} body</p>"),
            status,
        };
        let story = Story::new(user_id, draft);
        self.state.stories.insert(&story).await.unwrap();
        story
    }
}

fn test_config(db_path: std::path::PathBuf, public_dir: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: None,
            mode: config::RunMode::Production,
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            public_dir,
        },
        database: config::DatabaseConfig { path: db_path },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-that-is-32-bytes-long".to_string(),
            session_max_age: 3600,
            google: config::GoogleOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
            },
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Profile returned by [`FakeIdentityProvider`] for the code `"valid-code"`
pub fn test_profile() -> ProviderProfile {
    ProviderProfile {
        provider_id: "google-123".to_string(),
        display_name: "Ana Lima".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Lima".to_string(),
        image: Some("https://example.com/ana.png".to_string()),
    }
}

/// Identity provider that accepts the code `"valid-code"` only
pub struct FakeIdentityProvider {
    profile: ProviderProfile,
}

impl FakeIdentityProvider {
    pub fn new(profile: ProviderProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        Ok(Url::parse_with_params("https://accounts.example.com/auth", &[("state", state)]).unwrap())
    }

    async fn authenticate(&self, code: &str) -> Result<ProviderProfile, AppError> {
        if code == "valid-code" {
            Ok(self.profile.clone())
        } else {
            Err(AppError::Authentication("invalid_grant".to_string()))
        }
    }
}

/// Story store whose every query fails with a connection error
pub struct FailingStoryStore;

pub const STORE_FAILURE_DETAIL: &str = "connection refused by db-internal-7:5432";

fn store_failure() -> AppError {
    AppError::Internal(anyhow::anyhow!(STORE_FAILURE_DETAIL))
}

#[async_trait]
impl StoryStore for FailingStoryStore {
    async fn insert(&self, _story: &Story) -> Result<(), AppError> {
        Err(store_failure())
    }

    async fn find_by_owner(&self, _user_id: &str) -> Result<Vec<Story>, AppError> {
        Err(store_failure())
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Story>, AppError> {
        Err(store_failure())
    }

    async fn update_by_id(&self, _id: &str, _draft: &StoryDraft) -> Result<bool, AppError> {
        Err(store_failure())
    }

    async fn delete_by_id(&self, _id: &str) -> Result<bool, AppError> {
        Err(store_failure())
    }

    async fn find_public(&self) -> Result<Vec<PublicStory>, AppError> {
        Err(store_failure())
    }

    async fn find_public_by_owner(&self, _user_id: &str) -> Result<Vec<PublicStory>, AppError> {
        Err(store_failure())
    }
}

/// Store that delegates to the database and counts owner queries
pub struct CountingStoryStore {
    inner: Arc<Database>,
    pub owner_queries: AtomicUsize,
}

impl CountingStoryStore {
    pub fn new(inner: Arc<Database>) -> Self {
        Self {
            inner,
            owner_queries: AtomicUsize::new(0),
        }
    }

    pub fn owner_queries(&self) -> usize {
        self.owner_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryStore for CountingStoryStore {
    async fn insert(&self, story: &Story) -> Result<(), AppError> {
        self.inner.insert(story).await
    }

    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Story>, AppError> {
        self.owner_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_owner(user_id).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Story>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn update_by_id(&self, id: &str, draft: &StoryDraft) -> Result<bool, AppError> {
        self.inner.update_by_id(id, draft).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, AppError> {
        self.inner.delete_by_id(id).await
    }

    async fn find_public(&self) -> Result<Vec<PublicStory>, AppError> {
        self.inner.find_public().await
    }

    async fn find_public_by_owner(&self, user_id: &str) -> Result<Vec<PublicStory>, AppError> {
        self.inner.find_public_by_owner(user_id).await
    }
}
