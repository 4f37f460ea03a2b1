//! Database tests

use super::*;
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn profile(provider_id: &str, first_name: &str) -> ProviderProfile {
    ProviderProfile {
        provider_id: provider_id.to_string(),
        display_name: format!("{first_name} Tester"),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        image: Some("https://example.com/avatar.png".to_string()),
    }
}

fn draft(title: &str, status: StoryStatus) -> StoryDraft {
    StoryDraft {
        title: title.to_string(),
        body: format!("<p>{title}</p>"),
        status,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
}

#[tokio::test]
async fn test_find_or_create_user_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    let created = db.find_or_create_user(&profile("g-1", "Ana")).await.unwrap();
    assert_eq!(created.first_name, "Ana");

    // A changed provider profile does not mutate the stored user.
    let again = db
        .find_or_create_user(&profile("g-1", "Renamed"))
        .await
        .unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(again.first_name, "Ana");

    let fetched = db.get_user(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.google_id, "g-1");
}

#[tokio::test]
async fn test_story_crud() {
    let (db, _temp_dir) = create_test_db().await;

    let story = Story::new("u1", draft("Trip", StoryStatus::Public));
    db.insert(&story).await.unwrap();

    let retrieved = db.find_by_id(&story.id).await.unwrap().unwrap();
    assert_eq!(retrieved.title, "Trip");
    assert_eq!(retrieved.status, StoryStatus::Public);
    assert_eq!(retrieved.user_id, "u1");

    let updated = db
        .update_by_id(&story.id, &draft("Trip (edited)", StoryStatus::Draft))
        .await
        .unwrap();
    assert!(updated);
    let retrieved = db.find_by_id(&story.id).await.unwrap().unwrap();
    assert_eq!(retrieved.title, "Trip (edited)");
    assert_eq!(retrieved.status, StoryStatus::Draft);

    assert!(db.delete_by_id(&story.id).await.unwrap());
    assert!(db.find_by_id(&story.id).await.unwrap().is_none());
    assert!(!db.delete_by_id(&story.id).await.unwrap());
}

#[tokio::test]
async fn test_update_missing_story_reports_false() {
    let (db, _temp_dir) = create_test_db().await;

    let updated = db
        .update_by_id("missing", &draft("Nope", StoryStatus::Public))
        .await
        .unwrap();
    assert!(!updated);
}

#[tokio::test]
async fn test_find_by_owner_only_returns_owned_stories() {
    let (db, _temp_dir) = create_test_db().await;

    let mine = Story::new("u1", draft("Mine", StoryStatus::Draft));
    let theirs = Story::new("u2", draft("Theirs", StoryStatus::Public));
    db.insert(&mine).await.unwrap();
    db.insert(&theirs).await.unwrap();

    let stories = db.find_by_owner("u1").await.unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id, mine.id);
    assert!(stories.iter().all(|story| story.user_id == "u1"));

    assert!(db.find_by_owner("u3").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_public_excludes_drafts_and_joins_author() {
    let (db, _temp_dir) = create_test_db().await;

    let author = db.find_or_create_user(&profile("g-1", "Ana")).await.unwrap();

    let mut older = Story::new(&author.id, draft("Older", StoryStatus::Public));
    older.created_at = Utc::now() - Duration::hours(1);
    let newer = Story::new(&author.id, draft("Newer", StoryStatus::Public));
    let hidden = Story::new(&author.id, draft("Hidden", StoryStatus::Draft));
    let orphan = Story::new("ghost", draft("Orphan", StoryStatus::Public));
    for story in [&older, &newer, &hidden, &orphan] {
        db.insert(story).await.unwrap();
    }

    let public = db.find_public().await.unwrap();
    let titles: Vec<&str> = public.iter().map(|p| p.story.title.as_str()).collect();
    assert!(!titles.contains(&"Hidden"));
    assert_eq!(titles.len(), 3);

    let by_author = db.find_public_by_owner(&author.id).await.unwrap();
    let titles: Vec<&str> = by_author.iter().map(|p| p.story.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert_eq!(by_author[0].author_name, "Ana Tester");
    assert_eq!(
        by_author[0].author_image.as_deref(),
        Some("https://example.com/avatar.png")
    );
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (db, _temp_dir) = create_test_db().await;

    let now = Utc::now();
    let live = SessionRecord {
        id: EntityId::new().0,
        user_id: "u1".to_string(),
        created_at: now,
        expires_at: now + Duration::days(1),
    };
    let stale = SessionRecord {
        id: EntityId::new().0,
        user_id: "u1".to_string(),
        created_at: now - Duration::days(2),
        expires_at: now - Duration::days(1),
    };
    db.insert_session(&live).await.unwrap();
    db.insert_session(&stale).await.unwrap();

    let fetched = db.get_session(&live.id).await.unwrap().unwrap();
    assert_eq!(fetched.user_id, "u1");
    assert!(!fetched.is_expired());

    let purged = db.delete_expired_sessions(now).await.unwrap();
    assert_eq!(purged, 1);
    assert!(db.get_session(&stale.id).await.unwrap().is_none());

    db.delete_session(&live.id).await.unwrap();
    assert!(db.get_session(&live.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_closed_pool_surfaces_database_error() {
    let (db, _temp_dir) = create_test_db().await;
    db.close().await;

    let result = db.find_by_owner("u1").await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));
}
