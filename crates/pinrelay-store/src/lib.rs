//! Settings store abstractions and in-memory backend.
//!
//! The store owns two independent records: the per-channel relay mapping
//! (source channel -> destination channel) and the per-guild preference that
//! decides whether relayed posts impersonate guild member profiles.

use async_trait::async_trait;
use pinrelay_types::{ChannelId, GuildId};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

mod sqlite;

pub use sqlite::SqliteSettingsStore;

/// Result type for settings store operations.
pub type StoreResult<T> = Result<T, SettingsStoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum SettingsStoreError {
    #[error("channel {0} cannot relay pins to itself")]
    SelfRelay(ChannelId),
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Async store contract consumed by the relay pipeline and slash commands.
///
/// Every operation touches a single key; implementations must tolerate
/// concurrent reads and independent deletes from separate tasks.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn destination_channel(&self, source: ChannelId) -> StoreResult<Option<ChannelId>>;
    async fn set_destination_channel(
        &self,
        source: ChannelId,
        destination: ChannelId,
    ) -> StoreResult<()>;
    /// Removes the mapping keyed by `source`. Returns whether one existed.
    async fn remove_source_mapping(&self, source: ChannelId) -> StoreResult<bool>;
    /// Removes every mapping whose destination is `destination`.
    async fn remove_destination_mapping(&self, destination: ChannelId) -> StoreResult<usize>;
    async fn sources_for_destination(&self, destination: ChannelId)
        -> StoreResult<Vec<ChannelId>>;

    async fn uses_guild_profile(&self, guild: GuildId) -> StoreResult<bool>;
    async fn set_uses_guild_profile(&self, guild: GuildId, enabled: bool) -> StoreResult<()>;
}

/// In-memory implementation for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    destinations: HashMap<ChannelId, ChannelId>,
    guild_profiles: HashMap<GuildId, bool>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn destination_channel(&self, source: ChannelId) -> StoreResult<Option<ChannelId>> {
        Ok(self.inner.read().await.destinations.get(&source).copied())
    }

    async fn set_destination_channel(
        &self,
        source: ChannelId,
        destination: ChannelId,
    ) -> StoreResult<()> {
        if source == destination {
            return Err(SettingsStoreError::SelfRelay(source));
        }
        self.inner
            .write()
            .await
            .destinations
            .insert(source, destination);
        Ok(())
    }

    async fn remove_source_mapping(&self, source: ChannelId) -> StoreResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .destinations
            .remove(&source)
            .is_some())
    }

    async fn remove_destination_mapping(&self, destination: ChannelId) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.destinations.len();
        inner
            .destinations
            .retain(|_, mapped| *mapped != destination);
        Ok(before - inner.destinations.len())
    }

    async fn sources_for_destination(
        &self,
        destination: ChannelId,
    ) -> StoreResult<Vec<ChannelId>> {
        let inner = self.inner.read().await;
        let mut sources = inner
            .destinations
            .iter()
            .filter(|(_, mapped)| **mapped == destination)
            .map(|(source, _)| *source)
            .collect::<Vec<_>>();
        sources.sort();
        Ok(sources)
    }

    async fn uses_guild_profile(&self, guild: GuildId) -> StoreResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .guild_profiles
            .get(&guild)
            .copied()
            .unwrap_or(false))
    }

    async fn set_uses_guild_profile(&self, guild: GuildId, enabled: bool) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .guild_profiles
            .insert(guild, enabled);
        Ok(())
    }
}
