// ABOUTME: Process-lifetime identity cache for users and channels
// ABOUTME: Lazily filled from the Platform Client on first reference; entries are never evicted

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::{Channel, ChattingType, User};
use crate::error::TransportError;
use crate::traits::PlatformClient;

/// Owned user/channel cache held by one adapter instance.
///
/// Concurrent misses on the same id are not deduplicated: each task fetches
/// and inserts, and the last write wins. Cached records are projections of
/// platform data, so both writes carry the same value.
///
/// Locks are only held for a single map access and never across `.await`.
pub struct IdentityCache {
    client: Arc<dyn PlatformClient>,
    users: RwLock<HashMap<String, User>>,
    channels: RwLock<HashMap<String, Channel>>,
}

impl IdentityCache {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            users: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    pub fn get_channel(&self, id: &str) -> Option<Channel> {
        self.channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Cache `user` under `id`. Returns false, without mutating, for a blank id.
    pub fn add_user(&self, id: &str, user: User) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), user);
        true
    }

    /// Cache `channel` under `id`. Returns false, without mutating, for a blank id.
    pub fn add_channel(&self, id: &str, channel: Channel) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        self.channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), channel);
        true
    }

    pub fn user_count(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Return the cached user, or fetch the profile, cache it and return it.
    pub async fn resolve_user(&self, id: &str) -> Result<User, TransportError> {
        if let Some(user) = self.get_user(id) {
            return Ok(user);
        }

        let profile = self
            .client
            .fetch_user_profile(id)
            .await
            .map_err(|e| TransportError::new("fetch_user_profile", id, e))?;

        let user = User {
            id: id.to_string(),
            display_name: profile.display_name,
            email: profile.email,
        };

        if !self.add_user(id, user.clone()) {
            tracing::debug!(user_id = %id, "Not caching user with blank id");
        } else {
            tracing::debug!(user_id = %id, name = %user.display_name, "Cached user profile");
        }

        Ok(user)
    }

    /// Return the cached channel, or fetch its info, derive the chatting type,
    /// cache it and return it.
    pub async fn resolve_channel(&self, id: &str) -> Result<Channel, TransportError> {
        if let Some(channel) = self.get_channel(id) {
            return Ok(channel);
        }

        let info = self
            .client
            .fetch_channel_info(id)
            .await
            .map_err(|e| TransportError::new("fetch_channel_info", id, e))?;

        let channel = Channel {
            id: id.to_string(),
            name: info.name,
            chatting_type: ChattingType::from_flags(&info.flags),
        };

        if !self.add_channel(id, channel.clone()) {
            tracing::debug!(channel_id = %id, "Not caching channel with blank id");
        } else {
            tracing::debug!(
                channel_id = %id,
                chatting_type = ?channel.chatting_type,
                "Cached channel info"
            );
        }

        Ok(channel)
    }
}
