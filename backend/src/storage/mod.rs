//! # Storage Module
//!
//! Shared key-value store behind the session coordinator.
//!
//! Every battle, study session, presence record and friend list lives under
//! its own key as a JSON document. Entries carry a version so the domain
//! layer can do optimistic read-modify-write without transactions.
//!
//! Two backends implement [`KeyValueStore`]:
//! - [`SqliteStore`]: sqlx over a single `key_values` table
//! - [`MemoryStore`]: process-local map, used for `memory` deployments and tests

pub mod db;
pub mod memory;
pub mod traits;

pub use db::SqliteStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, Versioned};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Database URL value that selects the in-memory store
pub const MEMORY_STORE_URL: &str = "memory";

/// Open the store named by a database URL
pub async fn open_store(database_url: &str) -> Result<Arc<dyn KeyValueStore>> {
    if database_url == MEMORY_STORE_URL {
        info!("Using in-memory key-value store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Using SQLite key-value store at {}", database_url);
    Ok(Arc::new(SqliteStore::new(database_url).await?))
}
