use pinrelay_store::SettingsStore;

use crate::relay_error::RelayError;
use crate::relay_platform::RelayPlatform;
use crate::relay_types::{ChannelId, RelayEndpoint};

/// Finds or provisions the bot-owned relay endpoint for `destination`.
///
/// Threads post through their parent's endpoint with `thread_id` routing.
/// When the destination cannot host endpoints the mapping for `source` is
/// removed before `NoRelaySupport` is returned, so later pins from that
/// source are treated as unconfigured.
pub async fn resolve_endpoint(
    platform: &dyn RelayPlatform,
    store: &dyn SettingsStore,
    source: ChannelId,
    destination: ChannelId,
) -> Result<RelayEndpoint, RelayError> {
    let Some((container, thread)) = endpoint_container(platform, destination).await? else {
        match store.remove_source_mapping(source).await {
            Ok(removed) => tracing::info!(
                source_channel_id = %source,
                destination_channel_id = %destination,
                removed,
                "destination does not support relaying; mapping removed"
            ),
            Err(error) => tracing::warn!(
                source_channel_id = %source,
                destination_channel_id = %destination,
                error = %error,
                "failed to remove mapping for destination without relay support"
            ),
        }
        return Err(RelayError::NoRelaySupport { destination });
    };

    let bot = platform.current_user().await?;
    let existing = platform
        .list_endpoints(container)
        .await?
        .into_iter()
        .find(|endpoint| endpoint.owner == Some(bot.id));
    let endpoint = match existing {
        Some(endpoint) => endpoint,
        None => {
            let avatar = match platform.fetch_bytes(&bot.avatar_url).await {
                Ok(bytes) => Some(bytes),
                Err(error) => {
                    tracing::debug!(
                        error = %error,
                        "bot avatar unavailable; creating endpoint without icon"
                    );
                    None
                }
            };
            let endpoint = platform
                .create_endpoint(container, &bot.display_name, avatar)
                .await?;
            tracing::info!(channel_id = %container, "created relay endpoint");
            endpoint
        }
    };

    Ok(match thread {
        Some(thread) => RelayEndpoint {
            url: route_to_thread(&endpoint.url, thread),
            owner: endpoint.owner,
        },
        None => endpoint,
    })
}

/// Returns the endpoint container for `destination` and, for threads, the
/// thread to route into. `None` means no relay support.
async fn endpoint_container(
    platform: &dyn RelayPlatform,
    destination: ChannelId,
) -> Result<Option<(ChannelId, Option<ChannelId>)>, RelayError> {
    let Some(descriptor) = platform.describe_channel(destination).await? else {
        return Ok(None);
    };
    let Some(parent) = descriptor.thread_parent else {
        return Ok(descriptor.supports_endpoints.then_some((destination, None)));
    };
    let parent_supports = platform
        .describe_channel(parent)
        .await?
        .is_some_and(|parent| parent.supports_endpoints);
    Ok(parent_supports.then_some((parent, Some(destination))))
}

/// Appends `thread_id` routing to an endpoint URL.
pub fn route_to_thread(url: &str, thread: ChannelId) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}thread_id={thread}")
}
