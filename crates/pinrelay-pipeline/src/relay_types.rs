//! Platform-neutral snapshots exchanged between the pipeline stages.

pub use pinrelay_types::{message_jump_url, ChannelId, GuildId, MessageId, UserId};

pub const DISCORD_MAX_CONTENT_CHARS: usize = 2000;
pub const DISCORD_MAX_ATTACHMENTS_PER_POST: usize = 10;
pub const DISCORD_DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const ORIGINAL_MESSAGE_LABEL: &str = "Original message";
const JUMP_TO_MESSAGE_LABEL: &str = "Jump to message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Kind of the message that delivered a pin notification.
pub enum NoticeKind {
    /// The platform's synthetic "a message was pinned" marker.
    PinAdded,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinNotice {
    pub message_id: MessageId,
    pub guild_id: Option<GuildId>,
    pub kind: NoticeKind,
    /// The user who pinned the message; the platform authors the notice as them.
    pub pinner: UserId,
    pub referenced_message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable snapshot of a received pin notification. Consumed once.
pub struct PinEvent {
    pub source_channel_id: ChannelId,
    pub notice: PinNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Effective display name and avatar for a user, global or guild-scoped.
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceAttachment {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub duration_secs: Option<f64>,
    pub waveform: Option<Vec<u8>>,
}

impl SourceAttachment {
    /// Lower-cased extension of the filename, if it has one.
    pub fn extension(&self) -> Option<String> {
        let (_, extension) = self.filename.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }

    /// The attachment URL with its query string stripped.
    pub fn bare_url(&self) -> &str {
        self.url
            .split_once('?')
            .map(|(bare, _)| bare)
            .unwrap_or(self.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSticker {
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq)]
/// The pinned message as fetched from the source channel.
pub struct SourceMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author: UserProfile,
    pub content: String,
    pub attachments: Vec<SourceAttachment>,
    pub stickers: Vec<SourceSticker>,
}

impl SourceMessage {
    pub fn jump_url(&self) -> String {
        message_jump_url(self.guild_id, self.channel_id, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Capability flags of a channel, resolved once per operation.
pub struct ChannelDescriptor {
    pub id: ChannelId,
    pub supports_endpoints: bool,
    /// Set when the channel is a sub-thread; endpoints then live on the parent.
    pub thread_parent: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A webhook-style relay endpoint. The URL may carry thread routing.
pub struct RelayEndpoint {
    pub url: String,
    pub owner: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Name and avatar a relay post impersonates.
pub struct RelayIdentity {
    pub display_name: String,
    pub avatar_url: String,
}

impl From<UserProfile> for RelayIdentity {
    fn from(profile: UserProfile) -> Self {
        Self {
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkButton {
    pub fn original_message(url: impl Into<String>) -> Self {
        Self {
            label: ORIGINAL_MESSAGE_LABEL.to_string(),
            url: url.into(),
        }
    }

    pub fn jump_to_message(url: impl Into<String>) -> Self {
        Self {
            label: JUMP_TO_MESSAGE_LABEL.to_string(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMetadata {
    pub duration_secs: f64,
    pub waveform: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
/// A re-uploaded attachment with its bytes already downloaded.
pub struct RelayFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub voice: Option<VoiceMetadata>,
}

impl RelayFile {
    pub fn from_attachment(attachment: &SourceAttachment, bytes: Vec<u8>) -> Self {
        let voice = match (&attachment.content_type, &attachment.waveform) {
            (Some(_), Some(waveform)) => Some(VoiceMetadata {
                duration_secs: attachment.duration_secs.unwrap_or_default(),
                waveform: waveform.clone(),
            }),
            _ => None,
        };
        Self {
            filename: attachment.filename.clone(),
            bytes,
            voice,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One post ready to send through a relay endpoint.
pub struct RelayPost {
    pub content: Option<String>,
    pub files: Vec<RelayFile>,
    pub original_link: Option<LinkButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A plain bot message sent to a channel.
pub struct OutgoingMessage {
    pub content: String,
    pub link: Option<LinkButton>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Platform limits the reconstructor must respect.
pub struct RelayLimits {
    pub max_content_chars: usize,
    pub max_attachments_per_post: usize,
    /// Upload limit for messages outside a guild.
    pub default_max_upload_bytes: u64,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            max_content_chars: DISCORD_MAX_CONTENT_CHARS,
            max_attachments_per_post: DISCORD_MAX_ATTACHMENTS_PER_POST,
            default_max_upload_bytes: DISCORD_DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
