use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, channel::ChannelType, id::GuildId},
    prelude::Context,
};

fn all_commands() -> Vec<CreateCommand> {
    vec![
        join_command(),
        leave_command(),
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        nowplaying_command(),
        volume_command(),
        shuffle_command(),
        loop_command(),
        remove_command(),
        clearqueue_command(),
        history_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

// Conexión de voz

fn join_command() -> CreateCommand {
    CreateCommand::new("join")
        .description("Join a voice channel")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Channel, "channel", "Voice channel to join")
                .channel_types(vec![ChannelType::Voice, ChannelType::Stage]),
        )
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel")
}

// Reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play music from YouTube")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "Song to play (URL or search query)",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the current song")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume the current song")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current song")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback and clear the queue")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Show the currently playing song")
}

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Set the music volume")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "volume", "Volume level (0-100)")
                .required(true)
                .min_int_value(0)
                .max_int_value(100),
        )
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop").description("Toggle repeating the current song")
}

// Cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Show the music queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Page number")
                .min_int_value(1),
        )
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Shuffle the queue")
}

fn remove_command() -> CreateCommand {
    CreateCommand::new("remove")
        .description("Remove a song from the queue")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "position",
                "Position in the queue (as shown by /queue)",
            )
            .required(true)
            .min_int_value(1),
        )
}

fn clearqueue_command() -> CreateCommand {
    CreateCommand::new("clearqueue").description("Clear the music queue")
}

fn history_command() -> CreateCommand {
    CreateCommand::new("history")
        .description("Show recently played songs")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "limit", "How many songs (1-20)")
                .min_int_value(1)
                .max_int_value(20),
        )
}
