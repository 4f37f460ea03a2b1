//! HTTP handlers
//!
//! Page routes for the landing page, dashboard and stories, plus the
//! Prometheus scrape endpoint.

mod index;
mod metrics;
mod stories;

pub use index::{DashboardContext, index_router};
pub use metrics::metrics_router;
pub use stories::stories_router;

use crate::error::AppError;

/// Fallback for unknown paths; rendered as the `error/404` page.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
