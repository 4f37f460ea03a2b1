//! Story store
//!
//! Handlers talk to stories through [`StoryStore`] so the backing store
//! can be swapped out. [`Database`] is the production implementation.

use axum::async_trait;

use super::database::Database;
use super::models::{PublicStory, Story, StoryDraft, StoryStatus};
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// Document-style access to story records.
///
/// Every method returns plain owned values; nothing tied to the
/// underlying connection escapes.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Insert a new story
    async fn insert(&self, story: &Story) -> Result<(), AppError>;

    /// All stories owned by `user_id`, newest first
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Story>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Story>, AppError>;

    /// Replace the editable fields of a story
    ///
    /// # Returns
    /// `false` if no story has this id
    async fn update_by_id(&self, id: &str, draft: &StoryDraft) -> Result<bool, AppError>;

    /// # Returns
    /// `false` if no story has this id
    async fn delete_by_id(&self, id: &str) -> Result<bool, AppError>;

    /// Every public story with its author, newest first
    async fn find_public(&self) -> Result<Vec<PublicStory>, AppError>;

    /// Public stories of a single author, newest first
    async fn find_public_by_owner(&self, user_id: &str) -> Result<Vec<PublicStory>, AppError>;
}

const PUBLIC_STORY_COLUMNS: &str = r#"
    s.id, s.title, s.body, s.status, s.user_id, s.created_at,
    COALESCE(u.display_name, '') AS author_name,
    u.image AS author_image
"#;

#[async_trait]
impl StoryStore for Database {
    async fn insert(&self, story: &Story) -> Result<(), AppError> {
        observe_db_query("insert", "stories");
        sqlx::query(
            r#"
            INSERT INTO stories (id, title, body, status, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&story.id)
        .bind(&story.title)
        .bind(&story.body)
        .bind(story.status)
        .bind(&story.user_id)
        .bind(story.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Story>, AppError> {
        observe_db_query("select", "stories");
        let stories = sqlx::query_as::<_, Story>(
            "SELECT * FROM stories WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(stories)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Story>, AppError> {
        observe_db_query("select", "stories");
        let story = sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(story)
    }

    async fn update_by_id(&self, id: &str, draft: &StoryDraft) -> Result<bool, AppError> {
        observe_db_query("update", "stories");
        let result = sqlx::query("UPDATE stories SET title = ?, body = ?, status = ? WHERE id = ?")
            .bind(&draft.title)
            .bind(&draft.body)
            .bind(draft.status)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, AppError> {
        observe_db_query("delete", "stories");
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_public(&self) -> Result<Vec<PublicStory>, AppError> {
        observe_db_query("select", "stories");
        let query = format!(
            "SELECT {PUBLIC_STORY_COLUMNS} FROM stories s LEFT JOIN users u ON u.id = s.user_id \
             WHERE s.status = ? ORDER BY s.created_at DESC"
        );
        let stories = sqlx::query_as::<_, PublicStory>(&query)
            .bind(StoryStatus::Public)
            .fetch_all(self.pool())
            .await?;
        Ok(stories)
    }

    async fn find_public_by_owner(&self, user_id: &str) -> Result<Vec<PublicStory>, AppError> {
        observe_db_query("select", "stories");
        let query = format!(
            "SELECT {PUBLIC_STORY_COLUMNS} FROM stories s LEFT JOIN users u ON u.id = s.user_id \
             WHERE s.status = ? AND s.user_id = ? ORDER BY s.created_at DESC"
        );
        let stories = sqlx::query_as::<_, PublicStory>(&query)
            .bind(StoryStatus::Public)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(stories)
    }
}
