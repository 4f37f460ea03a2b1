//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations (users, sessions)
//! - Story store

mod database;
mod models;
mod store;

pub use database::Database;
pub use models::*;
pub use store::StoryStore;

#[cfg(test)]
mod database_test;
