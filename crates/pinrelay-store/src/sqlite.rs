//! SQLite-backed `SettingsStore` implementation with durable persistence.

use crate::{SettingsStore, SettingsStoreError, StoreResult};
use async_trait::async_trait;
use pinrelay_types::{ChannelId, GuildId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persistent SQLite store backend used by the bot process.
#[derive(Debug)]
pub struct SqliteSettingsStore {
    db_path: PathBuf,
}

impl SqliteSettingsStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        store.initialize_schema(&connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }

    fn initialize_schema(&self, connection: &Connection) -> StoreResult<()> {
        connection.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS relay_channels (
                source_channel_id INTEGER PRIMARY KEY,
                destination_channel_id INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_relay_channels_destination
                ON relay_channels (destination_channel_id);

            CREATE TABLE IF NOT EXISTS guild_preferences (
                guild_id INTEGER PRIMARY KEY,
                use_guild_profile INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn destination_channel(&self, source: ChannelId) -> StoreResult<Option<ChannelId>> {
        let connection = self.open_connection()?;
        let destination = connection
            .query_row(
                "SELECT destination_channel_id FROM relay_channels WHERE source_channel_id = ?1",
                params![id_to_db(source.get())],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(destination.map(|value| ChannelId::new(id_from_db(value))))
    }

    async fn set_destination_channel(
        &self,
        source: ChannelId,
        destination: ChannelId,
    ) -> StoreResult<()> {
        if source == destination {
            return Err(SettingsStoreError::SelfRelay(source));
        }
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT INTO relay_channels (source_channel_id, destination_channel_id)
            VALUES (?1, ?2)
            ON CONFLICT(source_channel_id)
                DO UPDATE SET destination_channel_id = excluded.destination_channel_id
            "#,
            params![id_to_db(source.get()), id_to_db(destination.get())],
        )?;
        Ok(())
    }

    async fn remove_source_mapping(&self, source: ChannelId) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let removed = connection.execute(
            "DELETE FROM relay_channels WHERE source_channel_id = ?1",
            params![id_to_db(source.get())],
        )?;
        Ok(removed > 0)
    }

    async fn remove_destination_mapping(&self, destination: ChannelId) -> StoreResult<usize> {
        let connection = self.open_connection()?;
        let removed = connection.execute(
            "DELETE FROM relay_channels WHERE destination_channel_id = ?1",
            params![id_to_db(destination.get())],
        )?;
        Ok(removed)
    }

    async fn sources_for_destination(
        &self,
        destination: ChannelId,
    ) -> StoreResult<Vec<ChannelId>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(
            r#"
            SELECT source_channel_id FROM relay_channels
            WHERE destination_channel_id = ?1
            ORDER BY source_channel_id
            "#,
        )?;
        let rows = statement.query_map(params![id_to_db(destination.get())], |row| {
            row.get::<_, i64>(0)
        })?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(ChannelId::new(id_from_db(row?)));
        }
        Ok(sources)
    }

    async fn uses_guild_profile(&self, guild: GuildId) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let flag = connection
            .query_row(
                "SELECT use_guild_profile FROM guild_preferences WHERE guild_id = ?1",
                params![id_to_db(guild.get())],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match flag {
            None | Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(other) => Err(SettingsStoreError::InvalidPersistedValue {
                field: "use_guild_profile",
                value: other.to_string(),
            }),
        }
    }

    async fn set_uses_guild_profile(&self, guild: GuildId, enabled: bool) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT INTO guild_preferences (guild_id, use_guild_profile)
            VALUES (?1, ?2)
            ON CONFLICT(guild_id) DO UPDATE SET use_guild_profile = excluded.use_guild_profile
            "#,
            params![id_to_db(guild.get()), i64::from(enabled)],
        )?;
        Ok(())
    }
}

// Snowflakes fill at most 63 bits in practice, but the cast keeps the full
// u64 range round-tripping through SQLite's signed INTEGER column.
fn id_to_db(value: u64) -> i64 {
    value as i64
}

fn id_from_db(value: i64) -> u64 {
    value as u64
}
