//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with embedded migrations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the pool; later queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        observe_db_query("select", "users");
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get user by the provider's subject id
    pub async fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        observe_db_query("select", "users");
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = ?")
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Find the user matching a provider profile, creating it on first login.
    ///
    /// Existing users are returned as stored; the provider profile does not
    /// overwrite them.
    pub async fn find_or_create_user(&self, profile: &ProviderProfile) -> Result<User, AppError> {
        if let Some(user) = self.get_user_by_google_id(&profile.provider_id).await? {
            return Ok(user);
        }

        let user = User {
            id: EntityId::new().0,
            google_id: profile.provider_id.clone(),
            display_name: profile.display_name.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            image: profile.image.clone(),
            created_at: Utc::now(),
        };

        observe_db_query("insert", "users");
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, google_id, display_name, first_name, last_name, image, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(google_id) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.google_id)
        .bind(&user.display_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.image)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            // Lost a race with a concurrent first login.
            return self
                .get_user_by_google_id(&profile.provider_id)
                .await?
                .ok_or(AppError::NotFound);
        }

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert a new session row
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        observe_db_query("insert", "sessions");
        sqlx::query(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get session by ID
    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        observe_db_query("select", "sessions");
        let session = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    /// Delete session by ID
    pub async fn delete_session(&self, id: &str) -> Result<(), AppError> {
        observe_db_query("delete", "sessions");
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every session that expired before `now`
    ///
    /// # Returns
    /// Number of deleted rows
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        observe_db_query("delete", "sessions");
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
