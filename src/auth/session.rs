//! Session management
//!
//! Sessions live server-side in the `sessions` table. The client only
//! holds an HMAC-signed session id in the `session` cookie.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::data::{Database, EntityId, Identity, SessionRecord};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the signed session id
pub const SESSION_COOKIE: &str = "session";

/// Creates, resolves and destroys server-side sessions.
pub struct SessionManager {
    db: Arc<Database>,
    secret: String,
    max_age: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, secret: String, max_age_seconds: i64) -> Self {
        Self {
            db,
            secret,
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    /// Start a session for `user_id`
    ///
    /// # Returns
    /// Signed cookie value
    pub async fn create(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let record = SessionRecord {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + self.max_age,
        };
        self.db.insert_session(&record).await?;

        tracing::debug!(user_id = %user_id, "Session created");
        sign_session_id(&record.id, &self.secret)
    }

    /// Resolve a cookie value to the identity it belongs to
    ///
    /// Bad signatures, unknown ids, expired sessions and sessions whose
    /// user no longer exists all resolve to `None`. Only store failures
    /// are errors.
    pub async fn resolve(&self, cookie_value: &str) -> Result<Option<Identity>, AppError> {
        let Some(session_id) = verify_session_id(cookie_value, &self.secret) else {
            return Ok(None);
        };

        let Some(record) = self.db.get_session(&session_id).await? else {
            return Ok(None);
        };

        if record.is_expired() {
            self.db.delete_session(&record.id).await?;
            return Ok(None);
        }

        let user = self.db.get_user(&record.user_id).await?;
        Ok(user.map(Identity::from))
    }

    /// End the session behind `cookie_value`, if any
    pub async fn destroy(&self, cookie_value: &str) -> Result<(), AppError> {
        if let Some(session_id) = verify_session_id(cookie_value, &self.secret) {
            self.db.delete_session(&session_id).await?;
        }
        Ok(())
    }

    /// Delete expired sessions
    ///
    /// # Returns
    /// Number of purged sessions
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.db.delete_expired_sessions(Utc::now()).await
    }
}

/// Sign a session id
///
/// Token format: id.base64(hmac_sha256(id))
pub fn sign_session_id(session_id: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(session_id.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", session_id, signature_b64))
}

/// Verify a signed session id
///
/// # Returns
/// The bare session id if the signature matches
pub fn verify_session_id(token: &str, secret: &str) -> Option<String> {
    let (session_id, signature_b64) = token.split_once('.')?;
    if session_id.is_empty() {
        return None;
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(session_id.to_string())
}
