use pinrelay_store::SettingsStore;

use crate::relay_platform::RelayPlatform;
use crate::relay_types::{GuildId, RelayIdentity, UserProfile};

/// Resolves the name and avatar a relay post should impersonate.
///
/// Guilds that opted into member profiles get the author's guild nickname and
/// avatar. Every lookup failure falls back to `author`, the global profile, so
/// this never fails.
pub async fn resolve_identity(
    platform: &dyn RelayPlatform,
    store: &dyn SettingsStore,
    author: &UserProfile,
    guild: Option<GuildId>,
) -> RelayIdentity {
    let Some(guild) = guild else {
        return author.clone().into();
    };

    let enabled = match store.uses_guild_profile(guild).await {
        Ok(enabled) => enabled,
        Err(error) => {
            tracing::warn!(
                guild_id = %guild,
                error = %error,
                "failed to read guild profile preference; using global profile"
            );
            false
        }
    };
    if !enabled {
        return author.clone().into();
    }

    match platform.fetch_member_profile(guild, author.id).await {
        Ok(profile) => profile.into(),
        Err(error) => {
            tracing::debug!(
                guild_id = %guild,
                user_id = %author.id,
                error = %error,
                "member profile unavailable; using global profile"
            );
            author.clone().into()
        }
    }
}
