//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with the configured
//! [`IdentityProvider`](super::IdentityProvider).

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;

use super::session::SESSION_COOKIE;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/callback - OAuth callback
/// - GET /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/logout", get(logout))
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to the provider with the state
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let csrf_state = generate_csrf_state();
    let location = state.identity_provider.authorization_url(&csrf_state)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/auth")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to(location.as_str())))
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set when the user declined consent
    error: Option<String>,
}

/// GET /auth/google/callback
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for a profile
/// 3. Find or create the user
/// 4. Create session and set cookie
/// 5. Redirect to the dashboard
///
/// Any failure sends the browser back to the login page.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let result = complete_login(&state, &query, &jar).await;
    let outcome = if result.is_ok() { "success" } else { "failure" };
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();

    let session_token = result?;
    let jar = jar
        .remove(removal_cookie(OAUTH_STATE_COOKIE, "/auth"))
        .add(
            Cookie::build((SESSION_COOKIE, session_token))
                .path("/")
                .http_only(true)
                .secure(state.config.should_use_secure_cookies())
                .same_site(SameSite::Lax)
                .build(),
        );

    Ok((jar, Redirect::to("/dashboard")))
}

async fn complete_login(
    state: &AppState,
    query: &CallbackQuery,
    jar: &CookieJar,
) -> Result<String, AppError> {
    if let Some(error) = &query.error {
        return Err(AppError::Authentication(format!("provider returned {error}")));
    }

    let returned_state = query
        .state
        .as_deref()
        .ok_or_else(|| AppError::Authentication("missing state".to_string()))?;
    verify_csrf_state(returned_state, jar)?;

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::Authentication("missing authorization code".to_string()))?;

    let profile = state.identity_provider.authenticate(code).await?;
    let user = state.db.find_or_create_user(&profile).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    state.sessions.create(&user.id).await
}

// =============================================================================
// Logout
// =============================================================================

/// GET /auth/logout
///
/// Destroys the server-side session, clears the cookie and redirects to login.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
    }

    let jar = jar.remove(removal_cookie(SESSION_COOKIE, "/"));
    Ok((jar, Redirect::to("/")))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(state: &str, jar: &CookieJar) -> Result<(), AppError> {
    match jar.get(OAUTH_STATE_COOKIE) {
        Some(cookie) if !state.is_empty() && cookie.value() == state => Ok(()),
        Some(_) => Err(AppError::Authentication("state mismatch".to_string())),
        None => Err(AppError::Authentication("missing state cookie".to_string())),
    }
}

fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path(path).http_only(true).build();
    cookie.make_removal();
    cookie
}
