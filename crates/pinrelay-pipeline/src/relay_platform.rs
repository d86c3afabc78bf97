//! Outbound boundary between the pipeline and the chat platform.

use async_trait::async_trait;
use thiserror::Error;

use crate::relay_types::{
    ChannelDescriptor, ChannelId, GuildId, MessageId, OutgoingMessage, PostedMessage,
    RelayEndpoint, RelayIdentity, RelayPost, SourceMessage, UserId, UserProfile,
};

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failures reported by a [`RelayPlatform`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("platform object not found: {0}")]
    NotFound(String),
    /// The platform refused a field of the payload, e.g. a disallowed username.
    #[error("platform rejected the request body: {0}")]
    InvalidFormBody(String),
    #[error("platform request failed with status {status} (code {code:?}): {message}")]
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("platform transport failure: {0}")]
    Transport(String),
}

/// Every network call the pipeline issues. Each method is a suspension point.
#[async_trait]
pub trait RelayPlatform: Send + Sync {
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<SourceMessage>;

    /// Returns `None` when the channel does not exist or is not visible.
    async fn describe_channel(&self, channel: ChannelId)
        -> PlatformResult<Option<ChannelDescriptor>>;

    async fn list_endpoints(&self, container: ChannelId) -> PlatformResult<Vec<RelayEndpoint>>;

    async fn create_endpoint(
        &self,
        container: ChannelId,
        name: &str,
        avatar: Option<Vec<u8>>,
    ) -> PlatformResult<RelayEndpoint>;

    /// Profile of the bot account itself.
    async fn current_user(&self) -> PlatformResult<UserProfile>;

    /// Maximum upload size in bytes for the guild's current boost tier.
    async fn guild_upload_limit(&self, guild: GuildId) -> PlatformResult<u64>;

    async fn fetch_member_profile(&self, guild: GuildId, user: UserId)
        -> PlatformResult<UserProfile>;

    async fn fetch_bytes(&self, url: &str) -> PlatformResult<Vec<u8>>;

    async fn execute_endpoint(
        &self,
        endpoint: &RelayEndpoint,
        post: RelayPost,
        identity: &RelayIdentity,
    ) -> PlatformResult<PostedMessage>;

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<PostedMessage>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    async fn unpin_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;
}
