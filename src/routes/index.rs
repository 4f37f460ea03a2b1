//! Landing and dashboard pages

use axum::{
    Router,
    extract::State,
    middleware,
    response::Html,
    routing::get,
};
use minijinja::{Value, context};
use serde::Serialize;

use crate::AppState;
use crate::auth::{CurrentUser, ensure_authenticated, ensure_guest};
use crate::data::{Identity, Story};
use crate::error::AppError;

/// Create index router
///
/// Routes:
/// - GET / - Login page (guests only)
/// - GET /dashboard - Personal story list (signed-in users only)
pub fn index_router() -> Router<AppState> {
    let guest = Router::new()
        .route("/", get(login_page))
        .route_layer(middleware::from_fn(ensure_guest));

    let protected = Router::new()
        .route("/dashboard", get(dashboard))
        .route_layer(middleware::from_fn(ensure_authenticated));

    guest.merge(protected)
}

/// GET /
async fn login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    state.views.page("login", context! {})
}

/// Data handed to the `dashboard` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardContext {
    /// First name of the signed-in user
    pub name: String,
    pub stories: Vec<Story>,
}

impl DashboardContext {
    /// Only stories owned by `identity` make it into the context.
    pub fn new(identity: &Identity, mut stories: Vec<Story>) -> Self {
        stories.retain(|story| story.is_owned_by(&identity.id));
        Self {
            name: identity.first_name.clone(),
            stories,
        }
    }
}

/// GET /dashboard
///
/// A failed store query renders the generic `error/500` page; nothing
/// from the error reaches the client.
async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Html<String>, AppError> {
    let stories = state.stories.find_by_owner(&identity.id).await?;
    let dashboard = DashboardContext::new(&identity, stories);

    state.views.page(
        "dashboard",
        context! { user => &identity, ..Value::from_serialize(&dashboard) },
    )
}
