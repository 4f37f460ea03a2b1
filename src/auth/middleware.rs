//! Session loading and access gates
//!
//! `load_session` runs first and attaches a [`SessionIdentity`] to every
//! request. The gates only look at that value: they never touch the
//! database and never modify the request.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::SESSION_COOKIE;
use crate::AppState;
use crate::data::Identity;
use crate::error::AppError;

/// Request-scoped identity resolved from the session cookie.
///
/// `None` means the request comes from a guest.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity(pub Option<Identity>);

/// Where a gate sends a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

/// Only signed-in users pass; guests go to the login page.
pub fn authenticated_gate(identity: Option<&Identity>) -> GateDecision {
    match identity {
        Some(_) => GateDecision::Allow,
        None => GateDecision::Redirect("/"),
    }
}

/// Only guests pass; signed-in users go to their dashboard.
pub fn guest_gate(identity: Option<&Identity>) -> GateDecision {
    match identity {
        Some(_) => GateDecision::Redirect("/dashboard"),
        None => GateDecision::Allow,
    }
}

fn request_identity(request: &Request) -> Option<&Identity> {
    request
        .extensions()
        .get::<SessionIdentity>()
        .and_then(|session| session.0.as_ref())
}

async fn apply_gate(decision: GateDecision, request: Request, next: Next) -> Response {
    match decision {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(location) => Redirect::to(location).into_response(),
    }
}

/// Middleware to resolve the session cookie into a [`SessionIdentity`]
///
/// Store failures abort the request with a 500; a missing or invalid
/// cookie simply yields a guest. The identity is also copied onto the
/// response so outer layers (error pages) can render the header.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.resolve(cookie.value()).await?,
        None => None,
    };

    request
        .extensions_mut()
        .insert(SessionIdentity(identity.clone()));
    let mut response = next.run(request).await;
    response.extensions_mut().insert(SessionIdentity(identity));
    Ok(response)
}

/// Gate for pages that need a signed-in user
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/dashboard", get(dashboard))
///     .route_layer(middleware::from_fn(ensure_authenticated));
/// ```
pub async fn ensure_authenticated(request: Request, next: Next) -> Response {
    let decision = authenticated_gate(request_identity(&request));
    apply_gate(decision, request, next).await
}

/// Gate for pages only guests should see, like the login page
pub async fn ensure_guest(request: Request, next: Next) -> Response {
    let decision = guest_gate(request_identity(&request));
    apply_gate(decision, request, next).await
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(identity): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", identity.first_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionIdentity>()
            .and_then(|session| session.0.clone())
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
