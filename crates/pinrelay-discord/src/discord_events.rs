//! Gateway event handler feeding the relay pipeline.

use std::sync::Arc;

use pinrelay_pipeline::{ChannelId, PinRelayPipeline};
use serenity::all as discord;
use serenity::client::{Context, EventHandler};

use crate::discord_convert::pin_event_from_message;
use crate::relay_commands::{register_global_commands, respond};

/// Every event is handed to its own task; the handler itself never awaits
/// pipeline work.
pub struct PinRelayHandler {
    pipeline: Arc<PinRelayPipeline>,
    register_commands: bool,
}

impl PinRelayHandler {
    pub fn new(pipeline: Arc<PinRelayPipeline>, register_commands: bool) -> Self {
        Self {
            pipeline,
            register_commands,
        }
    }
}

#[serenity::async_trait]
impl EventHandler for PinRelayHandler {
    async fn ready(&self, ctx: Context, ready: discord::Ready) {
        tracing::info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to discord gateway"
        );
        if !self.register_commands {
            return;
        }
        match register_global_commands(&ctx.http).await {
            Ok(count) => tracing::info!(count, "registered global slash commands"),
            Err(error) => tracing::error!(error = %error, "slash command registration failed"),
        }
    }

    async fn message(&self, _ctx: Context, message: discord::Message) {
        if message.kind != discord::MessageType::PinsAdd {
            return;
        }
        self.pipeline.spawn_pin_event(pin_event_from_message(&message));
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: discord::GuildChannel,
        _messages: Option<Vec<discord::Message>>,
    ) {
        self.pipeline.spawn_channel_deleted(ChannelId::new(channel.id.get()));
    }

    async fn thread_delete(
        &self,
        _ctx: Context,
        thread: discord::PartialGuildChannel,
        _full_thread_data: Option<discord::GuildChannel>,
    ) {
        self.pipeline.spawn_channel_deleted(ChannelId::new(thread.id.get()));
    }

    async fn interaction_create(&self, ctx: Context, interaction: discord::Interaction) {
        let discord::Interaction::Command(command) = interaction else {
            return;
        };
        let store = self.pipeline.store();
        tokio::spawn(async move {
            respond(&ctx.http, &command, store.as_ref()).await;
        });
    }
}
