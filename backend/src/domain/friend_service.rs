use std::sync::Arc;
use tracing::info;

use shared::{AddFriendRequest, Clock, Friend, FriendList};

use super::entity_store::EntityStore;
use super::errors::{require_non_empty, SessionError, SessionResult};

pub const FRIENDS_PREFIX: &str = "friends:";

/// One-directional friend lists, one document per user
#[derive(Clone)]
pub struct FriendService {
    entities: EntityStore,
    clock: Arc<dyn Clock>,
}

impl FriendService {
    pub fn new(entities: EntityStore, clock: Arc<dyn Clock>) -> Self {
        Self { entities, clock }
    }

    fn key(user_id: &str) -> String {
        format!("{}{}", FRIENDS_PREFIX, user_id)
    }

    /// Add `friendId` to the user's list. The reverse edge is not created.
    pub async fn add_friend(&self, request: AddFriendRequest) -> SessionResult<Vec<Friend>> {
        require_non_empty("userId", &request.user_id)?;
        require_non_empty("friendId", &request.friend_id)?;
        require_non_empty("friendName", &request.friend_name)?;
        if request.user_id == request.friend_id {
            return Err(SessionError::Validation("Cannot add yourself as a friend".to_string()));
        }

        let now = self.clock.now_millis();
        let list = self
            .entities
            .update(&Self::key(&request.user_id), |current: Option<FriendList>| {
                let mut list = current.unwrap_or_else(|| FriendList {
                    user_id: request.user_id.clone(),
                    friends: Vec::new(),
                });
                if !list.friends.iter().any(|f| f.friend_id == request.friend_id) {
                    list.friends.push(Friend {
                        friend_id: request.friend_id.clone(),
                        name: request.friend_name.clone(),
                        avatar: request.friend_avatar.clone(),
                        added_at: now,
                    });
                }
                Ok(list)
            })
            .await?;

        info!("{} has {} friends", request.user_id, list.friends.len());
        Ok(list.friends)
    }

    /// The user's friends in the order they were added; empty if none
    pub async fn list_friends(&self, user_id: &str) -> SessionResult<Vec<Friend>> {
        require_non_empty("userId", user_id)?;
        Ok(self
            .entities
            .get::<FriendList>(&Self::key(user_id))
            .await?
            .map(|list| list.friends)
            .unwrap_or_default())
    }
}
