use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use pinrelay_discord::{execute_command, RelayCommand};
use pinrelay_pipeline::{
    ChannelDescriptor, ChannelId, GuildId, MessageId, NoticeKind, OutgoingMessage, PinEvent,
    PinNotice, PinRelayOutcome, PinRelayPipeline, PlatformError, PlatformResult, PostedMessage,
    RecoveryAction, RelayEndpoint, RelayIdentity, RelayPlatform, RelayPost, SourceAttachment,
    SourceMessage, UserId, UserProfile, DISCORD_DEFAULT_MAX_UPLOAD_BYTES,
};
use pinrelay_store::{InMemorySettingsStore, SettingsStore, SqliteSettingsStore};
use tokio::sync::Mutex as AsyncMutex;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);

const GUILD: GuildId = GuildId::new(1);
const SOURCE: ChannelId = ChannelId::new(100);
const DESTINATION: ChannelId = ChannelId::new(200);
const NOTICE: MessageId = MessageId::new(300);
const PINNED: MessageId = MessageId::new(301);
const PINNER: UserId = UserId::new(7);
const BOT: UserId = UserId::new(9);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch(MessageId),
    Describe(ChannelId),
    ListEndpoints(ChannelId),
    CreateEndpoint(ChannelId),
    CurrentUser,
    UploadLimit(GuildId),
    Member(UserId),
    Bytes(String),
    Execute(RelayPost),
    Send(ChannelId, OutgoingMessage),
    Delete(ChannelId, MessageId),
    Unpin(ChannelId, MessageId),
}

#[derive(Default)]
struct ScriptedPlatform {
    messages: AsyncMutex<HashMap<MessageId, SourceMessage>>,
    channels: AsyncMutex<HashMap<ChannelId, ChannelDescriptor>>,
    calls: AsyncMutex<Vec<Call>>,
}

impl ScriptedPlatform {
    async fn with_message(self, message: SourceMessage) -> Self {
        self.messages.lock().await.insert(message.id, message);
        self
    }

    async fn with_channel(self, id: ChannelId, supports_endpoints: bool) -> Self {
        self.channels.lock().await.insert(
            id,
            ChannelDescriptor {
                id,
                supports_endpoints,
                thread_parent: None,
            },
        );
        self
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn executed(&self) -> Vec<RelayPost> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(post) => Some(post),
                _ => None,
            })
            .collect()
    }

    async fn sent(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                Call::Send(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl RelayPlatform for ScriptedPlatform {
    async fn fetch_message(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<SourceMessage> {
        self.record(Call::Fetch(message)).await;
        self.messages
            .lock()
            .await
            .get(&message)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("message {message}")))
    }

    async fn describe_channel(
        &self,
        channel: ChannelId,
    ) -> PlatformResult<Option<ChannelDescriptor>> {
        self.record(Call::Describe(channel)).await;
        Ok(self.channels.lock().await.get(&channel).copied())
    }

    async fn list_endpoints(&self, container: ChannelId) -> PlatformResult<Vec<RelayEndpoint>> {
        self.record(Call::ListEndpoints(container)).await;
        Ok(Vec::new())
    }

    async fn create_endpoint(
        &self,
        container: ChannelId,
        _name: &str,
        _avatar: Option<Vec<u8>>,
    ) -> PlatformResult<RelayEndpoint> {
        self.record(Call::CreateEndpoint(container)).await;
        Ok(RelayEndpoint {
            url: format!("https://discord.com/api/webhooks/{container}/token"),
            owner: Some(BOT),
        })
    }

    async fn current_user(&self) -> PlatformResult<UserProfile> {
        self.record(Call::CurrentUser).await;
        Ok(UserProfile {
            id: BOT,
            display_name: "PinRelay".to_string(),
            avatar_url: "https://cdn.example.com/bot.png".to_string(),
        })
    }

    async fn guild_upload_limit(&self, guild: GuildId) -> PlatformResult<u64> {
        self.record(Call::UploadLimit(guild)).await;
        Ok(DISCORD_DEFAULT_MAX_UPLOAD_BYTES)
    }

    async fn fetch_member_profile(
        &self,
        _guild: GuildId,
        user: UserId,
    ) -> PlatformResult<UserProfile> {
        self.record(Call::Member(user)).await;
        Err(PlatformError::NotFound(format!("member {user}")))
    }

    async fn fetch_bytes(&self, url: &str) -> PlatformResult<Vec<u8>> {
        self.record(Call::Bytes(url.to_string())).await;
        Ok(url.as_bytes().to_vec())
    }

    async fn execute_endpoint(
        &self,
        _endpoint: &RelayEndpoint,
        post: RelayPost,
        _identity: &RelayIdentity,
    ) -> PlatformResult<PostedMessage> {
        self.record(Call::Execute(post)).await;
        Ok(PostedMessage {
            id: MessageId::new(900),
            channel_id: DESTINATION,
        })
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<PostedMessage> {
        self.record(Call::Send(channel, message)).await;
        Ok(PostedMessage {
            id: MessageId::new(901),
            channel_id: channel,
        })
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.record(Call::Delete(channel, message)).await;
        Ok(())
    }

    async fn unpin_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.record(Call::Unpin(channel, message)).await;
        Ok(())
    }
}

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let count = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "pinrelay-{label}-{}-{tick}-{count}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("must create isolated workspace root");
        Self { root }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn pin_event() -> PinEvent {
    PinEvent {
        source_channel_id: SOURCE,
        notice: PinNotice {
            message_id: NOTICE,
            guild_id: Some(GUILD),
            kind: NoticeKind::PinAdded,
            pinner: PINNER,
            referenced_message_id: Some(PINNED),
        },
    }
}

fn pinned_message(content: &str, attachments: Vec<SourceAttachment>) -> SourceMessage {
    SourceMessage {
        id: PINNED,
        channel_id: SOURCE,
        guild_id: Some(GUILD),
        author: UserProfile {
            id: UserId::new(8),
            display_name: "author".to_string(),
            avatar_url: "https://cdn.example.com/author.png".to_string(),
        },
        content: content.to_string(),
        attachments,
        stickers: Vec::new(),
    }
}

fn pipeline(
    platform: &Arc<ScriptedPlatform>,
    store: &Arc<dyn SettingsStore>,
) -> Arc<PinRelayPipeline> {
    Arc::new(PinRelayPipeline::new(platform.clone(), Arc::clone(store)))
}

#[tokio::test]
async fn integration_pin_in_unmapped_channel_has_no_side_effects() {
    let platform = Arc::new(
        ScriptedPlatform::default()
            .with_message(pinned_message("hello", Vec::new()))
            .await
            .with_channel(DESTINATION, true)
            .await,
    );
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());

    let outcome = pipeline(&platform, &store)
        .spawn_pin_event(pin_event())
        .await
        .expect("join");
    assert_eq!(outcome, PinRelayOutcome::Unconfigured);
    assert!(platform.calls().await.is_empty());
}

#[tokio::test]
async fn integration_configured_short_text_relays_once_and_cleans_up() {
    let workspace = IsolatedWorkspace::new("short-text");
    let store: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(workspace.root().join("settings.sqlite")).expect("sqlite store"),
    );
    let reply = execute_command(
        RelayCommand::SetPinChannel {
            source: SOURCE,
            destination: DESTINATION,
        },
        store.as_ref(),
    )
    .await;
    assert_eq!(reply, "Pins from <#100> will now be sent to <#200>.");

    let platform = Arc::new(
        ScriptedPlatform::default()
            .with_message(pinned_message("short pin", Vec::new()))
            .await
            .with_channel(DESTINATION, true)
            .await,
    );
    let outcome = pipeline(&platform, &store)
        .handle_pin_event(pin_event())
        .await;
    assert_eq!(outcome, PinRelayOutcome::Relayed { posts: 1 });

    let posts = platform.executed().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content.as_deref(), Some("short pin"));
    let link = posts[0].original_link.as_ref().expect("original link");
    assert_eq!(link.url, "https://discord.com/channels/1/100/301");

    let sent = platform.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "<@7> pinned a message to <#200>.");
    assert_eq!(
        sent[0].link.as_ref().map(|link| link.url.as_str()),
        Some("https://discord.com/channels/1/200/900")
    );

    let calls = platform.calls().await;
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, Call::Delete(..) | Call::Unpin(..)))
            .count(),
        2
    );
    assert!(calls.contains(&Call::Delete(SOURCE, NOTICE)));
    assert!(calls.contains(&Call::Unpin(SOURCE, PINNED)));
    assert!(calls.contains(&Call::CreateEndpoint(DESTINATION)));
}

#[tokio::test]
async fn integration_destination_without_relay_support_heals_mapping() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    store
        .set_destination_channel(SOURCE, DESTINATION)
        .await
        .expect("map");
    let platform = Arc::new(
        ScriptedPlatform::default()
            .with_message(pinned_message("hello", Vec::new()))
            .await
            .with_channel(DESTINATION, false)
            .await,
    );

    let outcome = pipeline(&platform, &store)
        .handle_pin_event(pin_event())
        .await;
    assert_eq!(
        outcome,
        PinRelayOutcome::Recovered(RecoveryAction::ReportNoRelaySupport {
            destination: DESTINATION
        })
    );
    assert!(platform.executed().await.is_empty());
    assert_eq!(
        platform.sent().await,
        vec![OutgoingMessage::text("<#200> doesn't support relaying.")]
    );
    assert_eq!(
        store.destination_channel(SOURCE).await.expect("lookup"),
        None
    );
}

#[tokio::test]
async fn integration_oversized_attachment_is_relayed_as_bare_link() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    store
        .set_destination_channel(SOURCE, DESTINATION)
        .await
        .expect("map");
    let attachment = SourceAttachment {
        filename: "huge.mp4".to_string(),
        url: "https://cdn.example.com/attachments/1/2/huge.mp4?ex=abc&hm=def".to_string(),
        size: DISCORD_DEFAULT_MAX_UPLOAD_BYTES * 2,
        content_type: Some("video/mp4".to_string()),
        duration_secs: None,
        waveform: None,
    };
    let platform = Arc::new(
        ScriptedPlatform::default()
            .with_message(pinned_message("", vec![attachment]))
            .await
            .with_channel(DESTINATION, true)
            .await,
    );

    let outcome = pipeline(&platform, &store)
        .handle_pin_event(pin_event())
        .await;
    assert_eq!(outcome, PinRelayOutcome::Relayed { posts: 1 });

    let posts = platform.executed().await;
    assert!(posts[0].files.is_empty());
    assert_eq!(
        posts[0].content.as_deref(),
        Some("https://cdn.example.com/attachments/1/2/huge.mp4")
    );
    assert!(!platform
        .calls()
        .await
        .iter()
        .any(|call| matches!(call, Call::Bytes(url) if url.contains("huge.mp4"))));
}

#[tokio::test]
async fn integration_channel_delete_clears_source_and_destination_entries() {
    let workspace = IsolatedWorkspace::new("channel-delete");
    let store: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(workspace.root().join("settings.sqlite")).expect("sqlite store"),
    );
    let upstream = ChannelId::new(50);
    store
        .set_destination_channel(SOURCE, DESTINATION)
        .await
        .expect("map source");
    store
        .set_destination_channel(upstream, SOURCE)
        .await
        .expect("map upstream");

    let platform = Arc::new(ScriptedPlatform::default());
    let cleanup = pipeline(&platform, &store)
        .handle_channel_deleted(SOURCE)
        .await
        .expect("cleanup");
    assert!(cleanup.removed_source);
    assert_eq!(cleanup.orphaned_sources, vec![upstream]);
    assert_eq!(store.destination_channel(SOURCE).await.expect("get"), None);
    assert_eq!(store.destination_channel(upstream).await.expect("get"), None);
    assert!(platform.calls().await.is_empty());
}
