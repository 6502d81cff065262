//! Typed JSON access to the key-value store with optimistic updates.
//!
//! Every mutation reads the entry and its version, applies the domain rule to
//! the decoded value, and writes back with compare-and-swap. A lost race
//! re-reads and re-applies the rule, so capacity and status checks always see
//! the latest state.

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{SessionError, SessionResult};
use crate::storage::{KeyValueStore, Versioned};

/// Attempts before an update gives up with `ConcurrentUpdate`
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

/// A decoded entry together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub key: String,
    pub version: i64,
    pub value: T,
}

#[derive(Clone)]
pub struct EntityStore {
    store: Arc<dyn KeyValueStore>,
}

fn decode<T: DeserializeOwned>(entry: &Versioned) -> anyhow::Result<T> {
    serde_json::from_str(&entry.value).with_context(|| format!("Corrupt entry under {}", entry.key))
}

fn encode<T: Serialize>(key: &str, value: &T) -> anyhow::Result<String> {
    serde_json::to_string(value).with_context(|| format!("Failed to encode entry for {}", key))
}

impl EntityStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>> {
        match self.store.get(key).await? {
            Some(entry) => Ok(Some(decode(&entry)?)),
            None => Ok(None),
        }
    }

    /// All entries under a prefix. Entries that fail to decode are skipped.
    pub async fn list<T: DeserializeOwned>(&self, prefix: &str) -> SessionResult<Vec<Stored<T>>> {
        let entries = self.store.get_by_prefix(prefix).await?;
        let mut decoded = Vec::with_capacity(entries.len());
        for entry in entries {
            match decode(&entry) {
                Ok(value) => decoded.push(Stored {
                    key: entry.key,
                    version: entry.version,
                    value,
                }),
                Err(e) => warn!("Skipping entry: {:#}", e),
            }
        }
        Ok(decoded)
    }

    /// Unconditional write
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> SessionResult<()> {
        self.store.put(key, &encode(key, value)?).await?;
        Ok(())
    }

    /// Optimistic read-modify-write.
    ///
    /// `mutate` receives the current value (`None` if the key is absent) and
    /// may run several times. Returning the value unchanged skips the write.
    pub async fn update<T, F>(&self, key: &str, mut mutate: F) -> SessionResult<T>
    where
        T: Serialize + DeserializeOwned + Clone + PartialEq,
        F: FnMut(Option<T>) -> SessionResult<T>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (current, version) = match self.store.get(key).await? {
                Some(entry) => (Some(decode::<T>(&entry)?), Some(entry.version)),
                None => (None, None),
            };

            let before = current.clone();
            let updated = mutate(current)?;
            if before.as_ref() == Some(&updated) {
                return Ok(updated);
            }

            let value = encode(key, &updated)?;
            if self.store.compare_and_swap(key, version, &value).await? {
                return Ok(updated);
            }
            debug!("Lost update race on {} (attempt {}), retrying", key, attempt);
        }

        warn!("Giving up on {} after {} attempts", key, MAX_UPDATE_ATTEMPTS);
        Err(SessionError::ConcurrentUpdate(key.to_string()))
    }

    /// Delete an entry unless it was rewritten after `version` was read
    pub async fn delete_if_unchanged(&self, key: &str, version: i64) -> SessionResult<bool> {
        Ok(self.store.delete_if_version(key, version).await?)
    }
}
