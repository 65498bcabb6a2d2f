//! # Bot Module
//!
//! Discord shell around the per-guild music players.
//!
//! - Slash command registration and dispatch
//! - Voice connection management (one songbird transport per guild)
//! - Player reset when the bot is disconnected from voice
//!
//! The [`PulseForgeBot`] struct implements Serenity's [`EventHandler`] and owns
//! the [`PlayerRegistry`], the [`TrackResolver`] and the JSON history storage.

use anyhow::Result;
use serenity::{
    all::{
        ChannelId, Context, EventHandler, Guild, GuildId, Interaction, Ready, UnavailableGuild,
        VoiceState,
    },
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::{
        registry::PlayerRegistry,
        transport::{SongbirdTransport, VoiceTransport},
    },
    config::Config,
    sources::TrackResolver,
    storage::JsonStorage,
};

pub struct PulseForgeBot {
    config: Arc<Config>,
    /// Historial de reproducción (también es el HistoryRecorder de los players)
    pub storage: Arc<JsonStorage>,
    pub players: Arc<PlayerRegistry>,
    pub resolver: Arc<dyn TrackResolver>,
    http_client: reqwest::Client,
}

impl PulseForgeBot {
    pub fn new(
        config: Config,
        storage: Arc<JsonStorage>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Self {
        let players = Arc::new(PlayerRegistry::new(config.player_settings(), storage.clone()));

        Self {
            config: Arc::new(config),
            storage,
            players,
            resolver,
            http_client: reqwest::Client::new(),
        }
    }

    /// Registers slash commands globally, or in the development guild when
    /// `GUILD_ID` is set (faster propagation).
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ Bot is not in the configured guild: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }

    /// Connects to (or moves to) a voice channel and attaches the guild's
    /// voice session to its player.
    pub async fn join_voice_channel(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<()> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird not initialised"))?;

        let call = manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Error joining voice channel: {:?}", e);
            anyhow::anyhow!("Could not connect to the voice channel")
        })?;

        // songbird devuelve la misma Call al cambiar de canal; la sesión existente se reutiliza
        let http = self.http_client.clone();
        self.players.connect(guild_id, move || {
            Arc::new(SongbirdTransport::new(call, http)) as Arc<dyn VoiceTransport>
        });

        info!("🔊 Connected to voice channel {} in guild {}", channel_id, guild_id);
        Ok(())
    }

    /// Disconnects from voice. The guild's player is reset in place.
    pub async fn leave_voice_channel(&self, ctx: &Context, guild_id: GuildId) -> Result<()> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird not initialised"))?;

        self.players.disconnect(guild_id).await;
        manager.remove(guild_id).await?;

        info!("👋 Left voice channel in guild {}", guild_id);
        Ok(())
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.players.is_connected(guild_id)
    }
}

#[async_trait]
impl EventHandler for PulseForgeBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error registering commands: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error handling command: {:?}", e);
            }
        }
    }

    /// Drops the player of a guild the bot was removed from.
    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // unavailable = caída de Discord, no una expulsión
        if incomplete.unavailable {
            return;
        }

        if self.players.remove(incomplete.id).await.is_some() {
            info!(
                "🗑️ Left guild {}, {} players remaining",
                incomplete.id,
                self.players.len()
            );
        }
    }

    /// Resets the guild's player when the bot itself is disconnected
    /// (kicked, moved out, or the channel was deleted).
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot disconnected in guild {}", guild_id);
            self.players.disconnect(guild_id).await;
        }
    }
}
