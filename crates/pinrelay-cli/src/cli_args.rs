use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::CliSettingsBackend;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "pinrelay",
    about = "Discord bot that moves pinned messages into a pin log channel",
    version
)]
pub struct Cli {
    #[arg(
        long = "discord-token",
        env = "PINRELAY_DISCORD_TOKEN",
        hide_env_values = true,
        help = "Discord bot token"
    )]
    pub discord_token: String,

    #[arg(
        long = "settings-db",
        env = "PINRELAY_SETTINGS_DB",
        default_value = ".pinrelay/settings.sqlite",
        help = "SQLite database holding relay channel mappings and guild preferences"
    )]
    pub settings_db: PathBuf,

    #[arg(
        long = "settings-backend",
        env = "PINRELAY_SETTINGS_BACKEND",
        value_enum,
        default_value = "sqlite",
        help = "Settings storage backend"
    )]
    pub settings_backend: CliSettingsBackend,

    #[arg(
        long = "http-timeout-ms",
        env = "PINRELAY_HTTP_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout in milliseconds for attachment and avatar downloads"
    )]
    pub http_timeout_ms: u64,

    #[arg(
        long = "default-max-upload-bytes",
        env = "PINRELAY_DEFAULT_MAX_UPLOAD_BYTES",
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES,
        value_parser = parse_positive_u64,
        help = "Attachment re-upload limit for messages outside a guild or when the guild limit is unknown"
    )]
    pub default_max_upload_bytes: u64,

    #[arg(
        long = "register-commands",
        env = "PINRELAY_REGISTER_COMMANDS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Register the global slash commands when the gateway connects"
    )]
    pub register_commands: bool,
}
