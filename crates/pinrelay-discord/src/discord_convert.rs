//! Conversions between serenity models and the pipeline's snapshots.

use pinrelay_pipeline::{
    ChannelDescriptor, ChannelId, GuildId, MessageId, NoticeKind, PinEvent, PinNotice,
    PlatformError, SourceAttachment, SourceMessage, SourceSticker, UserId, UserProfile,
    DISCORD_DEFAULT_MAX_UPLOAD_BYTES,
};
use serenity::all as discord;
use serenity::http::HttpError;

/// Discord JSON error code for a rejected form field.
pub const INVALID_FORM_BODY_CODE: i64 = 50035;

const TIER_2_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const TIER_3_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

// serenity ids are non-zero; Discord never hands out a zero snowflake.
pub(crate) fn discord_channel(id: ChannelId) -> discord::ChannelId {
    discord::ChannelId::new(id.get())
}

pub(crate) fn discord_message(id: MessageId) -> discord::MessageId {
    discord::MessageId::new(id.get())
}

pub(crate) fn discord_guild(id: GuildId) -> discord::GuildId {
    discord::GuildId::new(id.get())
}

pub(crate) fn discord_user(id: UserId) -> discord::UserId {
    discord::UserId::new(id.get())
}

pub fn pin_event_from_message(message: &discord::Message) -> PinEvent {
    let kind = if message.kind == discord::MessageType::PinsAdd {
        NoticeKind::PinAdded
    } else {
        NoticeKind::Other
    };
    PinEvent {
        source_channel_id: ChannelId::new(message.channel_id.get()),
        notice: PinNotice {
            message_id: MessageId::new(message.id.get()),
            guild_id: message.guild_id.map(|id| GuildId::new(id.get())),
            kind,
            pinner: UserId::new(message.author.id.get()),
            referenced_message_id: message
                .message_reference
                .as_ref()
                .and_then(|reference| reference.message_id)
                .map(|id| MessageId::new(id.get())),
        },
    }
}

pub fn source_message(message: &discord::Message) -> SourceMessage {
    SourceMessage {
        id: MessageId::new(message.id.get()),
        channel_id: ChannelId::new(message.channel_id.get()),
        guild_id: message.guild_id.map(|id| GuildId::new(id.get())),
        author: user_profile(&message.author),
        content: message.content.clone(),
        attachments: message.attachments.iter().map(source_attachment).collect(),
        stickers: message
            .sticker_items
            .iter()
            .filter_map(|sticker| {
                sticker.image_url().map(|image_url| SourceSticker {
                    name: sticker.name.clone(),
                    image_url,
                })
            })
            .collect(),
    }
}

fn source_attachment(attachment: &discord::Attachment) -> SourceAttachment {
    SourceAttachment {
        filename: attachment.filename.clone(),
        url: attachment.url.clone(),
        size: u64::from(attachment.size),
        content_type: attachment.content_type.clone(),
        duration_secs: attachment.duration_secs,
        waveform: attachment.waveform.clone(),
    }
}

/// Global profile: global display name (falling back to the username) and
/// avatar (falling back to the default avatar).
pub fn user_profile(user: &discord::User) -> UserProfile {
    UserProfile {
        id: UserId::new(user.id.get()),
        display_name: user.display_name().to_string(),
        avatar_url: user.face(),
    }
}

/// Guild profile: nickname and guild avatar, each falling back to the global one.
pub fn member_profile(member: &discord::Member) -> UserProfile {
    UserProfile {
        id: UserId::new(member.user.id.get()),
        display_name: member.display_name().to_string(),
        avatar_url: member.face(),
    }
}

pub fn describe_channel(channel: &discord::Channel) -> Option<ChannelDescriptor> {
    match channel {
        discord::Channel::Guild(channel) => Some(describe_channel_kind(
            ChannelId::new(channel.id.get()),
            channel.kind,
            channel.parent_id.map(|id| ChannelId::new(id.get())),
        )),
        discord::Channel::Private(channel) => Some(ChannelDescriptor {
            id: ChannelId::new(channel.id.get()),
            supports_endpoints: false,
            thread_parent: None,
        }),
        _ => None,
    }
}

/// Maps a channel kind to its relay capability. Threads post through their
/// parent's endpoint, so they never support endpoints themselves.
pub fn describe_channel_kind(
    id: ChannelId,
    kind: discord::ChannelType,
    parent: Option<ChannelId>,
) -> ChannelDescriptor {
    use discord::ChannelType;

    match kind {
        ChannelType::Text
        | ChannelType::News
        | ChannelType::Voice
        | ChannelType::Stage
        | ChannelType::Forum => ChannelDescriptor {
            id,
            supports_endpoints: true,
            thread_parent: None,
        },
        ChannelType::NewsThread | ChannelType::PublicThread | ChannelType::PrivateThread => {
            ChannelDescriptor {
                id,
                supports_endpoints: false,
                thread_parent: parent,
            }
        }
        _ => ChannelDescriptor {
            id,
            supports_endpoints: false,
            thread_parent: None,
        },
    }
}

pub fn upload_limit_for_tier(tier: discord::PremiumTier) -> u64 {
    match tier {
        discord::PremiumTier::Tier2 => TIER_2_MAX_UPLOAD_BYTES,
        discord::PremiumTier::Tier3 => TIER_3_MAX_UPLOAD_BYTES,
        _ => DISCORD_DEFAULT_MAX_UPLOAD_BYTES,
    }
}

pub fn map_serenity_error(error: serenity::Error) -> PlatformError {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify_http_failure(
            response.status_code.as_u16(),
            Some(response.error.code as i64),
            response.error.message,
        ),
        other => PlatformError::Transport(other.to_string()),
    }
}

pub fn classify_http_failure(status: u16, code: Option<i64>, message: String) -> PlatformError {
    if code == Some(INVALID_FORM_BODY_CODE) {
        return PlatformError::InvalidFormBody(message);
    }
    if status == 404 {
        return PlatformError::NotFound(message);
    }
    PlatformError::Rejected {
        status,
        code,
        message,
    }
}
