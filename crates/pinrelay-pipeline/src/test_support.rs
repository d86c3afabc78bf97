use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::relay_platform::{PlatformError, PlatformResult, RelayPlatform};
use crate::relay_types::{
    ChannelDescriptor, ChannelId, GuildId, MessageId, OutgoingMessage, PostedMessage,
    RelayEndpoint, RelayIdentity, RelayPost, SourceMessage, UserId, UserProfile,
};

pub(crate) const BOT_USER_ID: u64 = 9_000;

/// Channel a scripted endpoint URL posts into: the thread when routed,
/// otherwise the container id embedded in the URL.
pub(crate) fn endpoint_channel(url: &str) -> ChannelId {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let thread = query
        .strip_prefix("thread_id=")
        .and_then(|value| value.parse::<u64>().ok());
    let container = path
        .split('/')
        .skip_while(|segment| *segment != "webhooks")
        .nth(1)
        .and_then(|value| value.parse::<u64>().ok());
    ChannelId::new(thread.or(container).unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlatformCall {
    FetchMessage(ChannelId, MessageId),
    DescribeChannel(ChannelId),
    ListEndpoints(ChannelId),
    CreateEndpoint {
        container: ChannelId,
        name: String,
        avatar: Option<Vec<u8>>,
    },
    CurrentUser,
    GuildUploadLimit(GuildId),
    FetchMemberProfile(GuildId, UserId),
    FetchBytes(String),
    ExecuteEndpoint {
        url: String,
        post: RelayPost,
        identity: RelayIdentity,
    },
    SendMessage(ChannelId, OutgoingMessage),
    DeleteMessage(ChannelId, MessageId),
    UnpinMessage(ChannelId, MessageId),
}

#[derive(Default)]
struct ScriptState {
    messages: HashMap<(ChannelId, MessageId), SourceMessage>,
    channels: HashMap<ChannelId, ChannelDescriptor>,
    endpoints: HashMap<ChannelId, Vec<RelayEndpoint>>,
    guild_limits: HashMap<GuildId, u64>,
    members: HashMap<(GuildId, UserId), UserProfile>,
    bytes: HashMap<String, Vec<u8>>,
    execute_failure: Option<PlatformError>,
    send_failure: Option<PlatformError>,
    unpin_failure: Option<PlatformError>,
    next_message_id: u64,
    calls: Vec<PlatformCall>,
}

/// Platform double that answers from scripted state and records every call.
pub(crate) struct ScriptedPlatform {
    state: Mutex<ScriptState>,
}

impl ScriptedPlatform {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                next_message_id: 50_000,
                ..ScriptState::default()
            }),
        }
    }

    pub(crate) fn bot_profile() -> UserProfile {
        UserProfile {
            id: UserId::new(BOT_USER_ID),
            display_name: "PinRelay".to_string(),
            avatar_url: "https://cdn.example.com/bot.png".to_string(),
        }
    }

    pub(crate) async fn script_message(&self, message: SourceMessage) {
        self.state
            .lock()
            .await
            .messages
            .insert((message.channel_id, message.id), message);
    }

    pub(crate) async fn script_channel(&self, descriptor: ChannelDescriptor) {
        self.state
            .lock()
            .await
            .channels
            .insert(descriptor.id, descriptor);
    }

    pub(crate) async fn script_endpoint(&self, container: ChannelId, endpoint: RelayEndpoint) {
        self.state
            .lock()
            .await
            .endpoints
            .entry(container)
            .or_default()
            .push(endpoint);
    }

    pub(crate) async fn script_guild_limit(&self, guild: GuildId, limit: u64) {
        self.state.lock().await.guild_limits.insert(guild, limit);
    }

    pub(crate) async fn script_member(&self, guild: GuildId, profile: UserProfile) {
        self.state
            .lock()
            .await
            .members
            .insert((guild, profile.id), profile);
    }

    pub(crate) async fn script_bytes(&self, url: &str, bytes: Vec<u8>) {
        self.state.lock().await.bytes.insert(url.to_string(), bytes);
    }

    pub(crate) async fn fail_execute(&self, error: PlatformError) {
        self.state.lock().await.execute_failure = Some(error);
    }

    pub(crate) async fn fail_send(&self, error: PlatformError) {
        self.state.lock().await.send_failure = Some(error);
    }

    pub(crate) async fn fail_unpin(&self, error: PlatformError) {
        self.state.lock().await.unpin_failure = Some(error);
    }

    pub(crate) async fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().await.calls.clone()
    }

    pub(crate) async fn executed_posts(&self) -> Vec<(String, RelayPost, RelayIdentity)> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::ExecuteEndpoint {
                    url,
                    post,
                    identity,
                } => Some((url, post, identity)),
                _ => None,
            })
            .collect()
    }

    pub(crate) async fn sent_messages(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::SendMessage(channel, message) => Some((channel, message)),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: PlatformCall) {
        self.state.lock().await.calls.push(call);
    }
}

#[async_trait]
impl RelayPlatform for ScriptedPlatform {
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<SourceMessage> {
        self.record(PlatformCall::FetchMessage(channel, message)).await;
        self.state
            .lock()
            .await
            .messages
            .get(&(channel, message))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("message {message}")))
    }

    async fn describe_channel(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelDescriptor>> {
        self.record(PlatformCall::DescribeChannel(channel)).await;
        Ok(self.state.lock().await.channels.get(&channel).copied())
    }

    async fn list_endpoints(&self, container: ChannelId) -> PlatformResult<Vec<RelayEndpoint>> {
        self.record(PlatformCall::ListEndpoints(container)).await;
        Ok(self
            .state
            .lock()
            .await
            .endpoints
            .get(&container)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_endpoint(
        &self,
        container: ChannelId,
        name: &str,
        avatar: Option<Vec<u8>>,
    ) -> PlatformResult<RelayEndpoint> {
        self.record(PlatformCall::CreateEndpoint {
            container,
            name: name.to_string(),
            avatar,
        })
        .await;
        let endpoint = RelayEndpoint {
            url: format!("https://discord.com/api/webhooks/{container}/created-token"),
            owner: Some(UserId::new(BOT_USER_ID)),
        };
        self.state
            .lock()
            .await
            .endpoints
            .entry(container)
            .or_default()
            .push(endpoint.clone());
        Ok(endpoint)
    }

    async fn current_user(&self) -> PlatformResult<UserProfile> {
        self.record(PlatformCall::CurrentUser).await;
        Ok(Self::bot_profile())
    }

    async fn guild_upload_limit(&self, guild: GuildId) -> PlatformResult<u64> {
        self.record(PlatformCall::GuildUploadLimit(guild)).await;
        self.state
            .lock()
            .await
            .guild_limits
            .get(&guild)
            .copied()
            .ok_or_else(|| PlatformError::NotFound(format!("guild {guild}")))
    }

    async fn fetch_member_profile(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> PlatformResult<UserProfile> {
        self.record(PlatformCall::FetchMemberProfile(guild, user)).await;
        self.state
            .lock()
            .await
            .members
            .get(&(guild, user))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("member {user}")))
    }

    async fn fetch_bytes(&self, url: &str) -> PlatformResult<Vec<u8>> {
        self.record(PlatformCall::FetchBytes(url.to_string())).await;
        self.state
            .lock()
            .await
            .bytes
            .get(url)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(url.to_string()))
    }

    async fn execute_endpoint(
        &self,
        endpoint: &RelayEndpoint,
        post: RelayPost,
        identity: &RelayIdentity,
    ) -> PlatformResult<PostedMessage> {
        self.record(PlatformCall::ExecuteEndpoint {
            url: endpoint.url.clone(),
            post,
            identity: identity.clone(),
        })
        .await;
        let mut state = self.state.lock().await;
        if let Some(error) = state.execute_failure.clone() {
            return Err(error);
        }
        state.next_message_id += 1;
        Ok(PostedMessage {
            id: MessageId::new(state.next_message_id),
            channel_id: endpoint_channel(&endpoint.url),
        })
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<PostedMessage> {
        self.record(PlatformCall::SendMessage(channel, message)).await;
        let mut state = self.state.lock().await;
        if let Some(error) = state.send_failure.clone() {
            return Err(error);
        }
        state.next_message_id += 1;
        Ok(PostedMessage {
            id: MessageId::new(state.next_message_id),
            channel_id: channel,
        })
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.record(PlatformCall::DeleteMessage(channel, message)).await;
        Ok(())
    }

    async fn unpin_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.record(PlatformCall::UnpinMessage(channel, message)).await;
        match self.state.lock().await.unpin_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
