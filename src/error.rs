//! Error types for StoryBooks
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse`. Error responses never carry
//! internal details; they are tagged with an [`ErrorPage`] marker
//! and rendered into a template by [`crate::views::render_error_pages`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// No identity on the request; sends the client back to the login page
    #[error("Authentication required")]
    Unauthorized,

    /// Federated login did not complete
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Template rendering error (500)
    #[error("Render error: {0}")]
    Render(#[from] minijinja::Error),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Marks a response whose body should be replaced by a rendered error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub StatusCode);

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unauthorized => (StatusCode::SEE_OTHER, "unauthorized"),
            AppError::Authentication(_) => (StatusCode::SEE_OTHER, "authentication"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "http_client"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            AppError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encryption"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Authentication problems become a redirect to the login page.
    /// Everything else becomes a bare status response tagged with
    /// [`ErrorPage`]; 5xx errors are logged here with full detail.
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        match &self {
            AppError::Unauthorized => return Redirect::to("/").into_response(),
            AppError::Authentication(reason) => {
                tracing::warn!(%reason, "Login failed");
                return Redirect::to("/").into_response();
            }
            _ => {}
        }

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let fallback_body = status.canonical_reason().unwrap_or("Error");
        let mut response = (status, fallback_body).into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
