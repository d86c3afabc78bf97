//! [`RelayPlatform`] over serenity's REST client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pinrelay_pipeline::{
    ChannelDescriptor, ChannelId, GuildId, MessageId, OutgoingMessage, PlatformError,
    PlatformResult, PostedMessage, RelayEndpoint, RelayIdentity, RelayPlatform, RelayPost,
    SourceMessage, UserId, UserProfile,
};
use serenity::all as discord;
use serenity::builder::{CreateActionRow, CreateAttachment, CreateButton, CreateMessage};
use serenity::http::Http;

use crate::discord_convert::{
    classify_http_failure, describe_channel, discord_channel, discord_guild, discord_message,
    discord_user, map_serenity_error, member_profile, source_message, upload_limit_for_tier,
};
use crate::discord_payload::{parse_webhook_url, webhook_create_body, webhook_execute_body};

pub struct DiscordRelayPlatform {
    http: Arc<Http>,
    downloads: reqwest::Client,
}

impl DiscordRelayPlatform {
    pub fn new(http: Arc<Http>, request_timeout_ms: u64) -> Result<Self> {
        let downloads = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create attachment download client")?;
        Ok(Self { http, downloads })
    }
}

pub(crate) async fn download_bytes(client: &reqwest::Client, url: &str) -> PlatformResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| PlatformError::Transport(format!("download request failed: {error}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(classify_http_failure(
            status.as_u16(),
            None,
            format!("download failed with status {}", status.as_u16()),
        ));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|error| PlatformError::Transport(format!("download body failed: {error}")))?;
    Ok(bytes.to_vec())
}

fn posted(message: &discord::Message) -> PostedMessage {
    PostedMessage {
        id: MessageId::new(message.id.get()),
        channel_id: ChannelId::new(message.channel_id.get()),
    }
}

fn endpoint_from_webhook(webhook: &discord::Webhook) -> Option<RelayEndpoint> {
    // Webhooks without a token (e.g. channel-follower webhooks) cannot be executed.
    let url = webhook.url().ok()?;
    Some(RelayEndpoint {
        url,
        owner: webhook.user.as_ref().map(|user| UserId::new(user.id.get())),
    })
}

#[async_trait]
impl RelayPlatform for DiscordRelayPlatform {
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<SourceMessage> {
        let message = self
            .http
            .get_message(discord_channel(channel), discord_message(message))
            .await
            .map_err(map_serenity_error)?;
        Ok(source_message(&message))
    }

    async fn describe_channel(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelDescriptor>> {
        match self.http.get_channel(discord_channel(channel)).await {
            Ok(channel) => Ok(describe_channel(&channel)),
            Err(error) => match map_serenity_error(error) {
                PlatformError::NotFound(_) | PlatformError::Rejected { status: 403, .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn list_endpoints(&self, container: ChannelId) -> PlatformResult<Vec<RelayEndpoint>> {
        let webhooks = self
            .http
            .get_channel_webhooks(discord_channel(container))
            .await
            .map_err(map_serenity_error)?;
        Ok(webhooks.iter().filter_map(endpoint_from_webhook).collect())
    }

    async fn create_endpoint(
        &self,
        container: ChannelId,
        name: &str,
        avatar: Option<Vec<u8>>,
    ) -> PlatformResult<RelayEndpoint> {
        let body = webhook_create_body(name, avatar.as_deref());
        let webhook = self
            .http
            .create_webhook(discord_channel(container), &body, None)
            .await
            .map_err(map_serenity_error)?;
        endpoint_from_webhook(&webhook).ok_or_else(|| {
            PlatformError::Transport(format!("created webhook {} has no token", webhook.id))
        })
    }

    async fn current_user(&self) -> PlatformResult<UserProfile> {
        let user = self
            .http
            .get_current_user()
            .await
            .map_err(map_serenity_error)?;
        Ok(UserProfile {
            id: UserId::new(user.id.get()),
            display_name: user.name.clone(),
            avatar_url: user.face(),
        })
    }

    async fn guild_upload_limit(&self, guild: GuildId) -> PlatformResult<u64> {
        let guild = self
            .http
            .get_guild(discord_guild(guild))
            .await
            .map_err(map_serenity_error)?;
        Ok(upload_limit_for_tier(guild.premium_tier))
    }

    async fn fetch_member_profile(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> PlatformResult<UserProfile> {
        let member = self
            .http
            .get_member(discord_guild(guild), discord_user(user))
            .await
            .map_err(map_serenity_error)?;
        Ok(member_profile(&member))
    }

    async fn fetch_bytes(&self, url: &str) -> PlatformResult<Vec<u8>> {
        download_bytes(&self.downloads, url).await
    }

    async fn execute_endpoint(
        &self,
        endpoint: &RelayEndpoint,
        post: RelayPost,
        identity: &RelayIdentity,
    ) -> PlatformResult<PostedMessage> {
        let target = parse_webhook_url(&endpoint.url)?;
        let body = webhook_execute_body(&post, identity);
        let files = post
            .files
            .into_iter()
            .map(|file| CreateAttachment::bytes(file.bytes, file.filename))
            .collect::<Vec<_>>();
        let message = self
            .http
            .execute_webhook(
                discord::WebhookId::new(target.webhook_id),
                target.thread_id.map(discord::ChannelId::new),
                &target.token,
                true,
                files,
                &body,
            )
            .await
            .map_err(map_serenity_error)?
            .ok_or_else(|| {
                PlatformError::Transport("webhook execution returned no message".to_string())
            })?;
        Ok(posted(&message))
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<PostedMessage> {
        let mut builder = CreateMessage::new().content(message.content);
        if let Some(link) = message.link {
            builder = builder.components(vec![CreateActionRow::Buttons(vec![
                CreateButton::new_link(link.url).label(link.label),
            ])]);
        }
        let sent = discord_channel(channel)
            .send_message(&*self.http, builder)
            .await
            .map_err(map_serenity_error)?;
        Ok(posted(&sent))
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.http
            .delete_message(discord_channel(channel), discord_message(message), None)
            .await
            .map_err(map_serenity_error)
    }

    async fn unpin_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.http
            .unpin_message(discord_channel(channel), discord_message(message), None)
            .await
            .map_err(map_serenity_error)
    }
}
