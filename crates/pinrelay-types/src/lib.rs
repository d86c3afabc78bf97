//! Shared identifier types for the pin relay crates.
//!
//! Every platform object is addressed by a 64-bit snowflake. The newtypes here
//! keep channel, guild, message, and user ids from being mixed up across the
//! store, pipeline, and Discord adapter boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a text channel, thread, or other channel-like container.
    ChannelId
);
snowflake_id!(
    /// Identifier of a guild (server).
    GuildId
);
snowflake_id!(
    /// Identifier of a single message.
    MessageId
);
snowflake_id!(
    /// Identifier of a user account, bots included.
    UserId
);

impl ChannelId {
    /// Renders the `<#id>` mention form.
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

impl UserId {
    /// Renders the `<@id>` mention form.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Builds the jump link clients use to scroll to a message.
///
/// Messages outside a guild use the `@me` path segment.
pub fn message_jump_url(
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    message_id: MessageId,
) -> String {
    match guild_id {
        Some(guild_id) => format!(
            "https://discord.com/channels/{}/{}/{}",
            guild_id, channel_id, message_id
        ),
        None => format!("https://discord.com/channels/@me/{}/{}", channel_id, message_id),
    }
}
