//! Identity provider
//!
//! The federated login protocol is hidden behind [`IdentityProvider`].
//! [`GoogleIdentityProvider`] implements the OAuth 2.0 authorization code
//! flow against Google.

use axum::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::GoogleOAuthConfig;
use crate::data::ProviderProfile;
use crate::error::AppError;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Narrow interface to a federated identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to, carrying the CSRF `state`
    fn authorization_url(&self, state: &str) -> Result<Url, AppError>;

    /// Exchange the callback's authorization code for a user profile
    async fn authenticate(&self, code: &str) -> Result<ProviderProfile, AppError>;
}

/// Google OAuth handler.
pub struct GoogleIdentityProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http_client: reqwest::Client,
}

/// Google token response
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Google user info from the userinfo endpoint
#[derive(Debug, Deserialize)]
struct GoogleUser {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUser> for ProviderProfile {
    fn from(user: GoogleUser) -> Self {
        let first_name = user.given_name.unwrap_or_default();
        let last_name = user.family_name.unwrap_or_default();
        let display_name = user
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{first_name} {last_name}").trim().to_string());

        Self {
            provider_id: user.sub,
            display_name,
            first_name,
            last_name,
            image: user.picture,
        }
    }
}

impl GoogleIdentityProvider {
    pub fn new(
        config: &GoogleOAuthConfig,
        redirect_uri: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri,
            http_client,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        Url::parse_with_params(
            GOOGLE_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid profile"),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(e.into()))
    }

    async fn authenticate(&self, code: &str) -> Result<ProviderProfile, AppError> {
        let token_response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !token_response.status().is_success() {
            return Err(AppError::Authentication(format!(
                "token exchange returned {}",
                token_response.status()
            )));
        }

        let token: GoogleTokenResponse = token_response.json().await?;

        let user: GoogleUser = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(user.into())
    }
}
