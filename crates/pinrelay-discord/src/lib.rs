//! Discord adapter for the pin relay pipeline.
//!
//! [`DiscordRelayPlatform`] implements the pipeline's outbound calls over
//! serenity's REST client. [`PinRelayHandler`] turns gateway events into pin
//! events, channel cleanups and slash command replies.

mod discord_convert;
mod discord_events;
mod discord_payload;
mod discord_platform;
pub mod relay_commands;

pub use discord_convert::{
    classify_http_failure, describe_channel_kind, map_serenity_error, pin_event_from_message,
    source_message, upload_limit_for_tier, INVALID_FORM_BODY_CODE,
};
pub use discord_events::PinRelayHandler;
pub use discord_payload::{
    avatar_data_uri, parse_webhook_url, webhook_execute_body, WebhookTarget,
    IS_VOICE_MESSAGE_FLAG,
};
pub use discord_platform::DiscordRelayPlatform;
pub use relay_commands::{command_definitions, execute_command, parse_command, RelayCommand};
