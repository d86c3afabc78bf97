//! End-to-end orchestration of a single pin relay.

use std::sync::Arc;

use pinrelay_store::{SettingsStore, StoreResult};
use tokio::task::JoinHandle;

use crate::relay_classifier::{classify, recover, RecoveryAction};
use crate::relay_endpoint::resolve_endpoint;
use crate::relay_error::RelayError;
use crate::relay_identity::resolve_identity;
use crate::relay_platform::RelayPlatform;
use crate::relay_reconstruct::{materialize, reconstruct};
use crate::relay_types::{
    message_jump_url, ChannelId, GuildId, LinkButton, MessageId, NoticeKind, OutgoingMessage,
    PinEvent, PostedMessage, RelayLimits, SourceMessage,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a pin event ended.
pub enum PinRelayOutcome {
    /// The message was not a pin notice.
    Ignored,
    /// The source channel has no relay mapping.
    Unconfigured,
    /// Aborted without posting anything; see the logs.
    Dropped,
    Relayed { posts: usize },
    /// A stage failed and the reported corrective action was taken.
    Recovered(RecoveryAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCleanup {
    pub removed_source: bool,
    /// Sources that relayed into the deleted channel and are now unconfigured.
    pub orphaned_sources: Vec<ChannelId>,
}

/// Shared pin relay service. Built once at startup and cloned as `Arc` into
/// every event task.
pub struct PinRelayPipeline {
    platform: Arc<dyn RelayPlatform>,
    store: Arc<dyn SettingsStore>,
    limits: RelayLimits,
}

impl PinRelayPipeline {
    pub fn new(platform: Arc<dyn RelayPlatform>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            platform,
            store,
            limits: RelayLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RelayLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.store)
    }

    /// Runs [`Self::handle_pin_event`] on its own task and returns immediately.
    pub fn spawn_pin_event(self: &Arc<Self>, event: PinEvent) -> JoinHandle<PinRelayOutcome> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.handle_pin_event(event).await })
    }

    pub async fn handle_pin_event(&self, event: PinEvent) -> PinRelayOutcome {
        if event.notice.kind != NoticeKind::PinAdded {
            return PinRelayOutcome::Ignored;
        }
        let source = event.source_channel_id;

        let destination = match self.store.destination_channel(source).await {
            Ok(Some(destination)) => destination,
            Ok(None) => return PinRelayOutcome::Unconfigured,
            Err(error) => {
                tracing::error!(
                    source_channel_id = %source,
                    error = %error,
                    "failed to read relay mapping; dropping pin event"
                );
                return PinRelayOutcome::Dropped;
            }
        };

        let Some(pinned) = event.notice.referenced_message_id else {
            let error = RelayError::MissingReference {
                notice: event.notice.message_id,
            };
            tracing::error!(source_channel_id = %source, error = %error, "dropping pin event");
            return PinRelayOutcome::Dropped;
        };

        let mut fetched = None;
        match self.relay(&event, destination, pinned, &mut fetched).await {
            Ok(posts) => {
                tracing::info!(
                    source_channel_id = %source,
                    destination_channel_id = %destination,
                    message_id = %pinned,
                    posts,
                    "relayed pinned message"
                );
                PinRelayOutcome::Relayed { posts }
            }
            Err(error) => {
                let action = classify(&error);
                match action {
                    RecoveryAction::ReportGenericFailure => tracing::error!(
                        source_channel_id = %source,
                        destination_channel_id = %destination,
                        message_id = %pinned,
                        error = %error,
                        "pin relay failed"
                    ),
                    _ => tracing::info!(
                        source_channel_id = %source,
                        destination_channel_id = %destination,
                        message_id = %pinned,
                        error = %error,
                        "pin relay rejected"
                    ),
                }
                let reported = recover(
                    self.platform.as_ref(),
                    self.store.as_ref(),
                    action,
                    source,
                    fetched.as_ref(),
                )
                .await;
                PinRelayOutcome::Recovered(reported)
            }
        }
    }

    async fn relay(
        &self,
        event: &PinEvent,
        destination: ChannelId,
        pinned: MessageId,
        fetched: &mut Option<SourceMessage>,
    ) -> Result<usize, RelayError> {
        let platform = self.platform.as_ref();
        let store = self.store.as_ref();
        let source = event.source_channel_id;

        let message: &SourceMessage =
            fetched.insert(platform.fetch_message(source, pinned).await?);
        let max_upload_bytes = self.upload_limit(message.guild_id).await;
        let plan = reconstruct(message, max_upload_bytes, &self.limits);
        let identity = resolve_identity(platform, store, &message.author, message.guild_id).await;
        let endpoint = resolve_endpoint(platform, store, source, destination).await?;

        // Each post is awaited before the next so parts land in order.
        let mut last_posted: Option<PostedMessage> = None;
        for (index, post_plan) in plan.posts.iter().enumerate() {
            let post = materialize(post_plan, platform).await?;
            let posted = platform.execute_endpoint(&endpoint, post, &identity).await?;
            tracing::debug!(
                source_channel_id = %source,
                message_id = %pinned,
                post_index = index,
                relay_message_id = %posted.id,
                "relay post sent"
            );
            last_posted = Some(posted);
        }

        let jump_url = match last_posted {
            Some(posted) => message_jump_url(message.guild_id, posted.channel_id, posted.id),
            None => message.jump_url(),
        };
        let confirmation = OutgoingMessage {
            content: format!(
                "{} pinned a message to {}.",
                event.notice.pinner.mention(),
                destination.mention()
            ),
            link: Some(LinkButton::jump_to_message(jump_url)),
        };
        let (confirmed, deleted, unpinned) = tokio::join!(
            platform.send_message(source, confirmation),
            platform.delete_message(source, event.notice.message_id),
            platform.unpin_message(source, message.id),
        );
        confirmed?;
        deleted?;
        unpinned?;
        Ok(plan.len())
    }

    async fn upload_limit(&self, guild: Option<GuildId>) -> u64 {
        let Some(guild) = guild else {
            return self.limits.default_max_upload_bytes;
        };
        match self.platform.guild_upload_limit(guild).await {
            Ok(limit) => limit,
            Err(error) => {
                tracing::warn!(
                    guild_id = %guild,
                    error = %error,
                    "failed to read guild upload limit; using default"
                );
                self.limits.default_max_upload_bytes
            }
        }
    }

    /// Runs [`Self::handle_channel_deleted`] on its own task, logging failures.
    pub fn spawn_channel_deleted(self: &Arc<Self>, channel: ChannelId) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = pipeline.handle_channel_deleted(channel).await {
                tracing::error!(
                    channel_id = %channel,
                    error = %error,
                    "failed to clean up relay mappings for deleted channel"
                );
            }
        })
    }

    /// Drops every mapping that names `channel` as source or destination.
    pub async fn handle_channel_deleted(&self, channel: ChannelId) -> StoreResult<ChannelCleanup> {
        let removed_source = self.store.remove_source_mapping(channel).await?;
        let orphaned_sources = self.store.sources_for_destination(channel).await?;
        let removed_destinations = self.store.remove_destination_mapping(channel).await?;
        if removed_source || removed_destinations > 0 {
            tracing::info!(
                channel_id = %channel,
                removed_source,
                removed_destinations,
                orphaned_sources = ?orphaned_sources,
                "removed relay mappings for deleted channel"
            );
        }
        Ok(ChannelCleanup {
            removed_source,
            orphaned_sources,
        })
    }
}
