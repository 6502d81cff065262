use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{KeyValueStore, Versioned};

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, (String, i64)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn versioned(key: &str, (value, version): &(String, i64)) -> Versioned {
    Versioned {
        key: key.to_string(),
        value: value.clone(),
        version: *version,
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|entry| versioned(key, entry)))
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Versioned>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| versioned(key, entry))
            .collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let version = entries.get(key).map(|(_, v)| v + 1).unwrap_or(1);
        entries.insert(key.to_string(), (value.to_string(), version));
        Ok(())
    }

    async fn compare_and_swap(&self, key: &str, expected_version: Option<i64>, value: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|(_, v)| *v);
        if current != expected_version {
            return Ok(false);
        }
        let version = current.map(|v| v + 1).unwrap_or(1);
        entries.insert(key.to_string(), (value.to_string(), version));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_if_version(&self, key: &str, version: i64) -> Result<bool> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((_, current)) if *current == version => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
