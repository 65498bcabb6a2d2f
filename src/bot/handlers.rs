use anyhow::Result;
use serenity::{
    all::{ChannelId, CommandInteraction, Context, GuildId, UserId},
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
};
use tracing::{info, warn};

use crate::{
    audio::{
        error::PlayerError,
        player::{Enqueued, GuildMusicPlayer, PlaybackState},
        queue::Track,
    },
    bot::PulseForgeBot,
    sources::TrackResolver,
    ui::embeds,
};

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &PulseForgeBot,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        respond(ctx, &command, embeds::create_error_embed("This command only works in a server!"))
            .await?;
        return Ok(());
    };

    info!(
        "📝 Command /{} from {} in guild {}",
        command.data.name, command.user.name, guild_id
    );

    // /play resuelve la pista (lento), así que difiere la respuesta
    if command.data.name == "play" {
        return handle_play(ctx, &command, bot, guild_id).await;
    }

    let outcome = match command.data.name.as_str() {
        "join" => handle_join(ctx, &command, bot, guild_id).await,
        "leave" => handle_leave(ctx, bot, guild_id).await,
        "pause" => handle_pause(bot, guild_id).await,
        "resume" => handle_resume(bot, guild_id).await,
        "skip" => handle_skip(bot, guild_id).await,
        "stop" => handle_stop(bot, guild_id).await,
        "queue" => Ok(handle_queue(&command, bot, guild_id)),
        "nowplaying" => handle_nowplaying(bot, guild_id),
        "volume" => handle_volume(&command, bot, guild_id).await,
        "shuffle" => Ok(handle_shuffle(bot, guild_id)),
        "loop" => Ok(handle_loop(bot, guild_id)),
        "remove" => handle_remove(&command, bot, guild_id),
        "clearqueue" => Ok(handle_clearqueue(bot, guild_id)),
        "history" => handle_history(&command, bot, guild_id).await,
        _ => Ok(embeds::create_error_embed("Unknown command")),
    };

    let embed = outcome.unwrap_or_else(|e| error_embed(&command.data.name, &e));
    respond(ctx, &command, embed).await
}

async fn respond(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
        )
        .await?;
    Ok(())
}

fn error_embed(command_name: &str, error: &anyhow::Error) -> CreateEmbed {
    match error.downcast_ref::<PlayerError>() {
        Some(player_error) => embeds::create_error_embed(user_message(player_error)),
        None => {
            warn!("⚠️ /{} failed: {:?}", command_name, error);
            embeds::create_error_embed(error)
        }
    }
}

/// Mensaje visible para el usuario de cada error del reproductor
pub fn user_message(error: &PlayerError) -> String {
    match error {
        PlayerError::OutOfRange {
            what: "volume",
            min,
            max,
            ..
        } => format!("Volume must be between {} and {}!", min, max),
        PlayerError::OutOfRange {
            what: "queue index",
            value,
            ..
        } => format!("There is no song at position {} in the queue!", value + 1),
        PlayerError::OutOfRange { value, .. } => {
            format!("There is no song at position {} in the queue!", value)
        }
        PlayerError::NothingPlaying => "Nothing is currently playing!".to_string(),
        PlayerError::NothingPaused => "Nothing is currently paused!".to_string(),
        PlayerError::NotConnected => "I'm not connected to any voice channel!".to_string(),
        PlayerError::QueueFull(max) => format!("The queue is full! ({} songs max)", max),
        PlayerError::ResolveFailed { .. } => {
            "Could not find or extract audio from the provided query.".to_string()
        }
        PlayerError::Transport(_) => "Playback failed, please try again.".to_string(),
    }
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn option_i64(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn option_channel(command: &CommandInteraction, name: &str) -> Option<ChannelId> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_channel_id())
}

/// Resuelve la consulta y la encola; arranca la reproducción si estaba inactivo.
pub(crate) async fn resolve_and_queue(
    resolver: &dyn TrackResolver,
    player: &GuildMusicPlayer,
    query: &str,
    requested_by: UserId,
) -> Result<(Track, Enqueued), PlayerError> {
    let track = resolver.resolve(query, requested_by).await?;
    let enqueued = player.play(track.clone()).await?;
    Ok((track, enqueued))
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &PulseForgeBot,
    guild_id: GuildId,
) -> Result<()> {
    let query = option_str(command, "query").unwrap_or_default().trim().to_string();

    if query.is_empty() {
        respond(ctx, command, embeds::create_error_embed("Please provide a song to play!"))
            .await?;
        return Ok(());
    }

    let Some(channel_id) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        respond(
            ctx,
            command,
            embeds::create_error_embed("You must be in a voice channel to play music!"),
        )
        .await?;
        return Ok(());
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    if !bot.is_connected(guild_id) {
        if let Err(e) = bot.join_voice_channel(ctx, guild_id, channel_id).await {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().embed(embeds::create_error_embed(e)),
                )
                .await?;
            return Ok(());
        }
    }

    let player = bot.players.get_or_create(guild_id);
    let embed = match resolve_and_queue(bot.resolver.as_ref(), &player, &query, command.user.id)
        .await
    {
        Ok((track, enqueued)) => {
            info!(
                "🎵 '{}' queued in guild {} (position {}, started: {})",
                track.title, guild_id, enqueued.position, enqueued.started
            );
            embeds::create_track_added_embed(&track, enqueued.position, enqueued.started)
        }
        Err(e) => {
            warn!("⚠️ /play '{}' failed in guild {}: {}", query, guild_id, e);
            embeds::create_error_embed(user_message(&e))
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}

async fn handle_join(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &PulseForgeBot,
    guild_id: GuildId,
) -> Result<CreateEmbed> {
    let channel_id = option_channel(command, "channel")
        .or_else(|| get_user_voice_channel(ctx, guild_id, command.user.id));

    let Some(channel_id) = channel_id else {
        return Ok(embeds::create_error_embed(
            "You must be in a voice channel or specify one!",
        ));
    };

    bot.join_voice_channel(ctx, guild_id, channel_id).await?;

    Ok(embeds::create_success_embed(
        "🎵 Joined Voice Channel",
        format!("Connected to <#{}>", channel_id),
    ))
}

async fn handle_leave(ctx: &Context, bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    if !bot.is_connected(guild_id) {
        return Err(PlayerError::NotConnected.into());
    }

    bot.leave_voice_channel(ctx, guild_id).await?;

    Ok(embeds::create_success_embed(
        "👋 Left Voice Channel",
        "Disconnected from the voice channel.",
    ))
}

async fn handle_pause(bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    bot.players.get_or_create(guild_id).pause().await?;
    Ok(embeds::create_success_embed("⏸️ Music Paused", "Use `/resume` to continue."))
}

async fn handle_resume(bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    bot.players.get_or_create(guild_id).resume().await?;
    Ok(embeds::create_success_embed("▶️ Music Resumed", "Playback continues."))
}

async fn handle_skip(bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    let player = bot.players.get_or_create(guild_id);
    let Some(current) = player.current() else {
        return Err(PlayerError::NothingPlaying.into());
    };

    // El avance llega por el callback de fin de pista
    player.stop().await?;

    Ok(embeds::create_success_embed(
        "⏭️ Song Skipped",
        format!("Skipped **{}**", current.title),
    ))
}

async fn handle_stop(bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    let player = bot.players.get_or_create(guild_id);
    player.set_loop(false);
    let cleared = player.clear();

    if player.state() != PlaybackState::Idle {
        player.stop().await?;
    }

    Ok(embeds::create_success_embed(
        "⏹️ Music Stopped",
        format!("Playback stopped and {} songs removed from the queue.", cleared),
    ))
}

fn handle_queue(command: &CommandInteraction, bot: &PulseForgeBot, guild_id: GuildId) -> CreateEmbed {
    let page = option_i64(command, "page").unwrap_or(1).max(1) as usize;
    let snapshot = bot.players.get_or_create(guild_id).snapshot();
    embeds::create_queue_embed(&snapshot, page)
}

fn handle_nowplaying(bot: &PulseForgeBot, guild_id: GuildId) -> Result<CreateEmbed> {
    let snapshot = bot.players.get_or_create(guild_id).snapshot();
    if snapshot.current.is_none() {
        return Err(PlayerError::NothingPlaying.into());
    }
    Ok(embeds::create_now_playing_embed(&snapshot))
}

async fn handle_volume(
    command: &CommandInteraction,
    bot: &PulseForgeBot,
    guild_id: GuildId,
) -> Result<CreateEmbed> {
    let percent = option_i64(command, "volume").unwrap_or(-1);
    bot.players.get_or_create(guild_id).set_volume(percent).await?;

    Ok(embeds::create_success_embed(
        "🔊 Volume Changed",
        format!("Volume set to {}%", percent),
    ))
}

fn handle_shuffle(bot: &PulseForgeBot, guild_id: GuildId) -> CreateEmbed {
    if !bot.players.get_or_create(guild_id).shuffle() {
        return embeds::create_warning_embed("🔀 Nothing to Shuffle", "The queue is empty!");
    }

    embeds::create_success_embed("🔀 Queue Shuffled", "The queue order has been randomized.")
}

fn handle_loop(bot: &PulseForgeBot, guild_id: GuildId) -> CreateEmbed {
    if bot.players.get_or_create(guild_id).toggle_loop() {
        embeds::create_success_embed("🔂 Loop Enabled", "The current song will repeat.")
    } else {
        embeds::create_success_embed("➡️ Loop Disabled", "The queue will continue normally.")
    }
}

fn handle_remove(
    command: &CommandInteraction,
    bot: &PulseForgeBot,
    guild_id: GuildId,
) -> Result<CreateEmbed> {
    let player = bot.players.get_or_create(guild_id);
    let position = option_i64(command, "position").unwrap_or(0);

    // Las posiciones mostradas por /queue empiezan en 1
    let removed = match usize::try_from(position) {
        Ok(position) if position >= 1 => player.remove_at(position - 1)?,
        _ => {
            let len = player.queue_len() as i64;
            return Err(PlayerError::out_of_range("position", position, 1, len).into());
        }
    };

    Ok(embeds::create_success_embed(
        "🗑️ Song Removed",
        format!("Removed **{}** from the queue.", removed.title),
    ))
}

fn handle_clearqueue(bot: &PulseForgeBot, guild_id: GuildId) -> CreateEmbed {
    let cleared = bot.players.get_or_create(guild_id).clear();
    embeds::create_success_embed(
        "🗑️ Queue Cleared",
        format!("Removed {} songs from the queue.", cleared),
    )
}

async fn handle_history(
    command: &CommandInteraction,
    bot: &PulseForgeBot,
    guild_id: GuildId,
) -> Result<CreateEmbed> {
    let limit = option_i64(command, "limit")
        .map(|l| l.clamp(1, 20) as usize)
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let entries = bot.storage.recent(guild_id.get(), limit).await?;
    Ok(embeds::create_history_embed(&entries))
}

/// Obtiene el canal de voz del usuario
fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    guild_id
        .to_guild_cached(&ctx.cache)?
        .voice_states
        .get(&user_id)
        .and_then(|vs| vs.channel_id)
}
