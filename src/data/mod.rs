//! Data layer module
//!
//! Handles all persistence for identity and sessions:
//! - Store interfaces injected into the session gateway
//! - SQLite implementation (durable)
//! - In-memory implementation (tests and single-process embedding)

mod database;
mod memory;
mod models;
mod store;

pub use database::Database;
pub use memory::MemoryStore;
pub use models::*;
pub use store::{OAuthStateStore, SessionStore, UserDirectory};

#[cfg(test)]
pub use store::{MockSessionStore, MockUserDirectory};
