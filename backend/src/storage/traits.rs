//! # Storage Traits
//!
//! The key-value abstraction the domain layer is written against.

use anyhow::Result;
use async_trait::async_trait;

/// A stored value together with its version stamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub key: String,
    pub value: String,
    /// Starts at 1 and increases by one on every write
    pub version: i64,
}

/// Versioned key-value storage
///
/// Keys are independent; there are no multi-key transactions. Conditional
/// writes are the only way to make read-modify-write safe under concurrency.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a single entry
    async fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Fetch every entry whose key starts with `prefix`, ordered by key
    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Versioned>>;

    /// Unconditional write. Creates the key or bumps its version.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Write only if the stored version still equals `expected_version`.
    ///
    /// `None` means "only if the key does not exist yet".
    /// Returns false when another writer got there first.
    async fn compare_and_swap(&self, key: &str, expected_version: Option<i64>, value: &str) -> Result<bool>;

    /// Delete a key. Returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete a key only if it has not been written since `version` was read
    async fn delete_if_version(&self, key: &str, version: i64) -> Result<bool>;
}
