use std::sync::Arc;

use anyhow::{Context, Result};
use pinrelay_cli::{Cli, CliSettingsBackend};
use pinrelay_discord::{DiscordRelayPlatform, PinRelayHandler};
use pinrelay_pipeline::{PinRelayPipeline, RelayLimits};
use pinrelay_store::{InMemorySettingsStore, SettingsStore, SqliteSettingsStore};
use serenity::all::GatewayIntents;
use serenity::http::Http;
use serenity::Client;

pub(crate) fn open_settings_store(cli: &Cli) -> Result<Arc<dyn SettingsStore>> {
    match cli.settings_backend {
        CliSettingsBackend::Memory => {
            tracing::warn!("using in-memory settings; relay mappings are lost on restart");
            Ok(Arc::new(InMemorySettingsStore::new()))
        }
        CliSettingsBackend::Sqlite => {
            let store = SqliteSettingsStore::new(&cli.settings_db).with_context(|| {
                format!(
                    "failed to open settings database {}",
                    cli.settings_db.display()
                )
            })?;
            tracing::info!(path = %cli.settings_db.display(), "opened settings database");
            Ok(Arc::new(store))
        }
    }
}

pub(crate) fn relay_limits(cli: &Cli) -> RelayLimits {
    RelayLimits {
        default_max_upload_bytes: cli.default_max_upload_bytes,
        ..RelayLimits::default()
    }
}

pub(crate) async fn run_bot(cli: Cli) -> Result<()> {
    let store = open_settings_store(&cli)?;
    let http = Arc::new(Http::new(&cli.discord_token));
    let platform = DiscordRelayPlatform::new(http, cli.http_timeout_ms)?;
    let pipeline = Arc::new(
        PinRelayPipeline::new(Arc::new(platform), store).with_limits(relay_limits(&cli)),
    );

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&cli.discord_token, intents)
        .event_handler(PinRelayHandler::new(pipeline, cli.register_commands))
        .await
        .context("failed to build discord client")?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::select! {
        result = client.start() => {
            result.context("discord gateway stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            shard_manager.shutdown_all().await;
        }
    }
    Ok(())
}
