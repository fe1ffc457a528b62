//! Application state management.
//!
//! This module defines the shared application state passed to route builders.

use mongodb::{Client, Database};

/// Shared application state.
///
/// Cloning is cheap: the MongoDB client and database share one connection pool.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// MongoDB client (cloneable, shares underlying connection pool)
    pub mongo_client: Client,
    /// MongoDB database instance
    pub db: Database,
}
