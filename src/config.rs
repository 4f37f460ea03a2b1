//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use url::Host;

use crate::error::AppError;

const MIN_SESSION_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number. Derived from `mode` when unset.
    pub port: Option<u16>,
    /// Run mode; `dev` enables request tracing
    #[serde(default)]
    pub mode: RunMode,
    /// Public domain (e.g., "stories.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Directory served under `/static`
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://stories.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    /// Port to bind, falling back to the mode's default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.mode {
            RunMode::Dev => 5000,
            RunMode::Production => 3000,
        })
    }
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Run mode selector
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Dev,
    #[default]
    Production,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (Google OAuth + sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session cookie signing secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 1209600 = 14 days)
    pub session_max_age: i64,
    pub google: GoogleOAuthConfig,
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (STORYBOOKS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.mode", "production")?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("server.public_dir", "public")?
            .set_default("database.path", "data/storybooks.db")?
            .set_default("auth.session_max_age", 1_209_600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("STORYBOOKS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Cookies are `Secure` unless we serve plain http on a local domain.
    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_domain(&self.server.domain)
    }

    /// Redirect URI registered with the identity provider.
    pub fn google_callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.server.base_url())
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.auth.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Config(format!(
                "auth.session_secret needs at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be positive".to_string(),
            ));
        }

        let https = self.server.protocol.eq_ignore_ascii_case("https");
        match (https, is_local_domain(&self.server.domain)) {
            (false, false) => Err(AppError::Config(format!(
                "server.protocol must be https to serve {}",
                self.server.domain
            ))),
            (false, true) => {
                tracing::warn!(
                    domain = %self.server.domain,
                    "Serving over plain http; session cookies are not marked secure"
                );
                Ok(())
            }
            (true, _) => Ok(()),
        }
    }
}

/// `localhost`, `*.localhost`, loopback and unspecified addresses, with or
/// without a port.
fn is_local_domain(domain: &str) -> bool {
    let Ok(url) = url::Url::parse(&format!("http://{}", domain.trim())) else {
        return false;
    };

    match url.host() {
        Some(Host::Domain(name)) => {
            let name = name.trim_end_matches('.');
            name == "localhost" || name.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_unspecified(),
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip.is_unspecified(),
        None => false,
    }
}
