//! `/pinchannel` and `/serverprofile` slash commands.
//!
//! Parsing and execution are separate: [`execute_command`] is a pure function
//! of the parsed command and the settings store, so it runs without Discord.

use anyhow::{Context, Result};
use pinrelay_pipeline::{ChannelId, GuildId};
use pinrelay_store::{SettingsStore, SettingsStoreError};
use serenity::all as discord;
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::http::Http;

pub const PIN_CHANNEL_COMMAND: &str = "pinchannel";
pub const SERVER_PROFILE_COMMAND: &str = "serverprofile";
pub const COMMAND_FAILURE_REPLY: &str = "An error occurred while running this command.";
const UNKNOWN_COMMAND_REPLY: &str = "This command can only be used inside a server channel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    SetPinChannel {
        source: ChannelId,
        destination: ChannelId,
    },
    RemovePinChannel {
        source: ChannelId,
    },
    GetPinChannel {
        source: ChannelId,
    },
    SetServerProfile {
        guild: GuildId,
        enabled: bool,
    },
}

/// Runs `command` against `store` and returns the reply text.
pub async fn execute_command(command: RelayCommand, store: &dyn SettingsStore) -> String {
    match run_command(command, store).await {
        Ok(reply) => reply,
        Err(SettingsStoreError::SelfRelay(_)) => {
            "Pins can't be sent to the same channel they were pinned in.".to_string()
        }
        Err(error) => {
            tracing::error!(command = ?command, error = %error, "relay command failed");
            COMMAND_FAILURE_REPLY.to_string()
        }
    }
}

async fn run_command(
    command: RelayCommand,
    store: &dyn SettingsStore,
) -> Result<String, SettingsStoreError> {
    match command {
        RelayCommand::SetPinChannel {
            source,
            destination,
        } => {
            store.set_destination_channel(source, destination).await?;
            Ok(format!(
                "Pins from {} will now be sent to {}.",
                source.mention(),
                destination.mention()
            ))
        }
        RelayCommand::RemovePinChannel { source } => {
            if store.remove_source_mapping(source).await? {
                Ok(format!(
                    "Pins from {} will no longer be sent to another channel.",
                    source.mention()
                ))
            } else {
                Ok(not_relayed_reply(source))
            }
        }
        RelayCommand::GetPinChannel { source } => match store.destination_channel(source).await? {
            Some(destination) => Ok(format!(
                "Pins from {} are sent to {}.",
                source.mention(),
                destination.mention()
            )),
            None => Ok(not_relayed_reply(source)),
        },
        RelayCommand::SetServerProfile { guild, enabled } => {
            store.set_uses_guild_profile(guild, enabled).await?;
            Ok(if enabled {
                "Pinned messages will now use server profiles.".to_string()
            } else {
                "Pinned messages will now use global profiles.".to_string()
            })
        }
    }
}

fn not_relayed_reply(source: ChannelId) -> String {
    format!(
        "Pins from {} are not being sent to another channel.",
        source.mention()
    )
}

/// Parses a slash command invocation. Returns `None` outside a guild or for
/// unknown commands and options.
pub fn parse_command(interaction: &discord::CommandInteraction) -> Option<RelayCommand> {
    let guild = GuildId::new(interaction.guild_id?.get());
    let source = ChannelId::new(interaction.channel_id.get());
    let options = &interaction.data.options;

    match interaction.data.name.as_str() {
        PIN_CHANNEL_COMMAND => {
            let subcommand = options.first()?;
            let discord::CommandDataOptionValue::SubCommand(arguments) = &subcommand.value else {
                return None;
            };
            match subcommand.name.as_str() {
                "set" => {
                    let destination = arguments.iter().find_map(|option| match option.value {
                        discord::CommandDataOptionValue::Channel(id) if option.name == "channel" => {
                            Some(ChannelId::new(id.get()))
                        }
                        _ => None,
                    })?;
                    Some(RelayCommand::SetPinChannel {
                        source,
                        destination,
                    })
                }
                "remove" => Some(RelayCommand::RemovePinChannel { source }),
                "get" => Some(RelayCommand::GetPinChannel { source }),
                _ => None,
            }
        }
        SERVER_PROFILE_COMMAND => {
            let enabled = options.iter().find_map(|option| match option.value {
                discord::CommandDataOptionValue::Boolean(enabled) if option.name == "enabled" => {
                    Some(enabled)
                }
                _ => None,
            })?;
            Some(RelayCommand::SetServerProfile { guild, enabled })
        }
        _ => None,
    }
}

pub fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(PIN_CHANNEL_COMMAND)
            .description("Configure where pinned messages from this channel are sent")
            .dm_permission(false)
            .default_member_permissions(discord::Permissions::MANAGE_CHANNELS)
            .add_option(
                CreateCommandOption::new(
                    discord::CommandOptionType::SubCommand,
                    "set",
                    "Send pins from this channel to another channel",
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        discord::CommandOptionType::Channel,
                        "channel",
                        "The channel to send pins to",
                    )
                    .required(true),
                ),
            )
            .add_option(CreateCommandOption::new(
                discord::CommandOptionType::SubCommand,
                "remove",
                "Stop sending pins from this channel to another channel",
            ))
            .add_option(CreateCommandOption::new(
                discord::CommandOptionType::SubCommand,
                "get",
                "Show where pins from this channel are sent",
            )),
        CreateCommand::new(SERVER_PROFILE_COMMAND)
            .description("Use server nicknames and avatars for pinned messages")
            .dm_permission(false)
            .default_member_permissions(discord::Permissions::MANAGE_CHANNELS)
            .add_option(
                CreateCommandOption::new(
                    discord::CommandOptionType::Boolean,
                    "enabled",
                    "Whether to use server profiles",
                )
                .required(true),
            ),
    ]
}

pub async fn register_global_commands(http: &Http) -> Result<usize> {
    let registered = discord::Command::set_global_commands(http, command_definitions())
        .await
        .context("failed to register global slash commands")?;
    Ok(registered.len())
}

/// Parses, executes and answers an interaction with an ephemeral reply.
pub async fn respond(
    http: &Http,
    interaction: &discord::CommandInteraction,
    store: &dyn SettingsStore,
) {
    let reply = match parse_command(interaction) {
        Some(command) => execute_command(command, store).await,
        None => UNKNOWN_COMMAND_REPLY.to_string(),
    };
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(reply)
            .ephemeral(true),
    );
    if let Err(error) = interaction.create_response(http, response).await {
        tracing::warn!(
            command = %interaction.data.name,
            error = %error,
            "failed to answer slash command"
        );
    }
}
