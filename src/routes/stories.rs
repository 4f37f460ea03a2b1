//! Story pages
//!
//! All routes require a signed-in user. Stories can only be edited or
//! deleted by their owner; drafts are only visible to their owner.

use axum::{
    Form, Router,
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use serde::Deserialize;

use crate::AppState;
use crate::auth::{CurrentUser, ensure_authenticated};
use crate::data::{Identity, Story, StoryDraft, StoryStatus};
use crate::error::AppError;

/// Create stories router
///
/// Routes:
/// - GET /stories - Public stories
/// - POST /stories - Create story
/// - GET /stories/add - New story form
/// - GET /stories/edit/:id - Edit form
/// - GET /stories/user/:user_id - Public stories of one user
/// - GET /stories/:id - Show story
/// - PUT /stories/:id - Update story
/// - DELETE /stories/:id - Delete story
/// - POST /stories/:id - Form submission with `_method` override
pub fn stories_router() -> Router<AppState> {
    Router::new()
        .route("/stories", get(list_public).post(create))
        .route("/stories/add", get(add_page))
        .route("/stories/edit/:id", get(edit_page))
        .route("/stories/user/:user_id", get(list_by_user))
        .route(
            "/stories/:id",
            get(show).put(update).delete(delete).post(method_override),
        )
        .route_layer(middleware::from_fn(ensure_authenticated))
}

fn validate_draft(draft: StoryDraft) -> Result<StoryDraft, AppError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    Ok(StoryDraft {
        title: title.to_string(),
        ..draft
    })
}

/// Look up a story the current user wants to modify
///
/// # Returns
/// `None` if the story belongs to someone else
///
/// # Errors
/// `NotFound` if there is no such story
async fn find_owned_story(
    state: &AppState,
    id: &str,
    identity: &Identity,
) -> Result<Option<Story>, AppError> {
    let story = state.stories.find_by_id(id).await?.ok_or(AppError::NotFound)?;
    Ok(story.is_owned_by(&identity.id).then_some(story))
}

// =============================================================================
// Listing
// =============================================================================

/// GET /stories
async fn list_public(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Response, AppError> {
    let stories = state.stories.find_public().await?;
    let page = state.views.page(
        "stories/index",
        context! { user => identity, stories => stories },
    )?;
    Ok(page.into_response())
}

/// GET /stories/user/:user_id
async fn list_by_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let stories = state.stories.find_public_by_owner(&user_id).await?;
    let page = state.views.page(
        "stories/index",
        context! { user => identity, stories => stories },
    )?;
    Ok(page.into_response())
}

/// GET /stories/:id
///
/// Drafts of other users are reported as missing.
async fn show(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let story = state.stories.find_by_id(&id).await?.ok_or(AppError::NotFound)?;
    if story.status == StoryStatus::Draft && !story.is_owned_by(&identity.id) {
        return Err(AppError::NotFound);
    }

    let author = state
        .db
        .get_user(&story.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let page = state.views.page(
        "stories/show",
        context! { user => identity, story => story, author => author },
    )?;
    Ok(page.into_response())
}

// =============================================================================
// Create
// =============================================================================

/// GET /stories/add
async fn add_page(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Response, AppError> {
    let page = state.views.page("stories/add", context! { user => identity })?;
    Ok(page.into_response())
}

/// POST /stories
async fn create(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Form(draft): Form<StoryDraft>,
) -> Result<Response, AppError> {
    let story = Story::new(&identity.id, validate_draft(draft)?);
    state.stories.insert(&story).await?;

    tracing::info!(story_id = %story.id, user_id = %identity.id, "Story created");
    Ok(Redirect::to("/dashboard").into_response())
}

// =============================================================================
// Edit / Update / Delete
// =============================================================================

/// GET /stories/edit/:id
async fn edit_page(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(story) = find_owned_story(&state, &id, &identity).await? else {
        return Ok(Redirect::to("/stories").into_response());
    };

    let page = state.views.page(
        "stories/edit",
        context! { user => identity, story => story },
    )?;
    Ok(page.into_response())
}

/// PUT /stories/:id
async fn update(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    Form(draft): Form<StoryDraft>,
) -> Result<Response, AppError> {
    update_story(&state, &identity, &id, draft).await
}

/// DELETE /stories/:id
async fn delete(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    delete_story(&state, &identity, &id).await
}

/// HTML forms can only send GET and POST; `_method` names the real verb.
#[derive(Debug, Deserialize)]
struct MethodOverrideForm {
    #[serde(rename = "_method")]
    method: String,
    title: Option<String>,
    body: Option<String>,
    status: Option<StoryStatus>,
}

/// POST /stories/:id
async fn method_override(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<MethodOverrideForm>,
) -> Result<Response, AppError> {
    match form.method.to_ascii_uppercase().as_str() {
        "PUT" => {
            let draft = StoryDraft {
                title: form.title.unwrap_or_default(),
                body: form.body.unwrap_or_default(),
                status: form.status.unwrap_or_default(),
            };
            update_story(&state, &identity, &id, draft).await
        }
        "DELETE" => delete_story(&state, &identity, &id).await,
        other => Err(AppError::Validation(format!(
            "unsupported method override: {other}"
        ))),
    }
}

async fn update_story(
    state: &AppState,
    identity: &Identity,
    id: &str,
    draft: StoryDraft,
) -> Result<Response, AppError> {
    let draft = validate_draft(draft)?;
    if find_owned_story(state, id, identity).await?.is_none() {
        return Ok(Redirect::to("/stories").into_response());
    }

    if !state.stories.update_by_id(id, &draft).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(story_id = %id, user_id = %identity.id, "Story updated");
    Ok(Redirect::to("/dashboard").into_response())
}

async fn delete_story(
    state: &AppState,
    identity: &Identity,
    id: &str,
) -> Result<Response, AppError> {
    if find_owned_story(state, id, identity).await?.is_none() {
        return Ok(Redirect::to("/stories").into_response());
    }

    state.stories.delete_by_id(id).await?;

    tracing::info!(story_id = %id, user_id = %identity.id, "Story deleted");
    Ok(Redirect::to("/dashboard").into_response())
}
