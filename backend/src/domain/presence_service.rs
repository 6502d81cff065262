use std::sync::Arc;
use tracing::{debug, info};

use shared::{Clock, PresenceRecord, PresenceRequest, PRESENCE_TTL_MS};

use super::entity_store::EntityStore;
use super::errors::{require_non_empty, SessionResult};

pub const PRESENCE_PREFIX: &str = "online:";

/// Tracks who has been active recently
#[derive(Clone)]
pub struct PresenceService {
    entities: EntityStore,
    clock: Arc<dyn Clock>,
}

impl PresenceService {
    pub fn new(entities: EntityStore, clock: Arc<dyn Clock>) -> Self {
        Self { entities, clock }
    }

    fn key(user_id: &str) -> String {
        format!("{}{}", PRESENCE_PREFIX, user_id)
    }

    /// Upsert the caller's presence with `lastActive = now`
    pub async fn record_presence(&self, request: PresenceRequest) -> SessionResult<PresenceRecord> {
        require_non_empty("userId", &request.user_id)?;
        require_non_empty("name", &request.name)?;

        let record = PresenceRecord {
            user_id: request.user_id,
            name: request.name,
            avatar: request.avatar,
            level: request.level,
            last_active: self.clock.now_millis(),
        };
        self.entities.put(&Self::key(&record.user_id), &record).await?;
        debug!("Recorded presence for {}", record.user_id);
        Ok(record)
    }

    /// Users seen within the presence window, most recent first
    pub async fn list_online_users(&self) -> SessionResult<Vec<PresenceRecord>> {
        let now = self.clock.now_millis();
        let mut users: Vec<PresenceRecord> = self
            .entities
            .list::<PresenceRecord>(PRESENCE_PREFIX)
            .await?
            .into_iter()
            .map(|stored| stored.value)
            .filter(|record| now - record.last_active < PRESENCE_TTL_MS)
            .collect();
        users.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(users)
    }

    /// Delete presence records past the window. Returns how many were removed.
    pub async fn purge_expired(&self) -> SessionResult<usize> {
        let now = self.clock.now_millis();
        let mut removed = 0;
        for stored in self.entities.list::<PresenceRecord>(PRESENCE_PREFIX).await? {
            if now - stored.value.last_active >= PRESENCE_TTL_MS
                && self.entities.delete_if_unchanged(&stored.key, stored.version).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Purged {} stale presence records", removed);
        }
        Ok(removed)
    }
}
