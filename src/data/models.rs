//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A user resolved from the identity provider
///
/// Created on first login and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Stable subject id issued by Google
    pub google_id: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    /// Avatar URL
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub first_name: String,
    pub image: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            first_name: user.first_name,
            image: user.image,
        }
    }
}

/// Profile returned by the identity provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
}

// =============================================================================
// Story
// =============================================================================

/// Story visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StoryStatus {
    /// Only visible to the owner
    Draft,
    #[default]
    Public,
}

/// A user-authored story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Story {
    pub id: String,
    pub title: String,
    /// HTML body as written in the editor
    pub body: String,
    pub status: StoryStatus,
    /// Owning user
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Build a new story owned by `user_id`
    pub fn new(user_id: &str, draft: StoryDraft) -> Self {
        Self {
            id: EntityId::new().0,
            title: draft.title,
            body: draft.body,
            status: draft.status,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Editable fields of a story, as submitted by the add/edit forms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub status: StoryStatus,
}

/// A public story together with its author's profile
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicStory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub story: Story,
    pub author_name: String,
    pub author_image: Option<String>,
}

// =============================================================================
// Session
// =============================================================================

/// Server-side session row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
