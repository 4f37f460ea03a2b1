//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Server-side session management
//! - Access gates

mod middleware;
mod oauth;
mod provider;
pub mod session;

pub use middleware::{
    CurrentUser, GateDecision, SessionIdentity, authenticated_gate, ensure_authenticated,
    ensure_guest, guest_gate, load_session,
};
pub use oauth::auth_router;
pub use provider::{GoogleIdentityProvider, IdentityProvider};
pub use session::{SESSION_COOKIE, SessionManager};
