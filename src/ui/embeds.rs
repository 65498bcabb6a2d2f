use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::{
    audio::{
        player::{PlaybackState, PlayerSnapshot},
        queue::Track,
    },
    storage::HistoryEntry,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 PulseForge";

pub const QUEUE_PAGE_SIZE: usize = 10;

/// Formatea segundos como `m:ss` o `h:mm:ss`
pub fn format_duration(secs: u64) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;

    if minutes >= 60 {
        format!("{}:{:02}:{:02}", minutes / 60, minutes % 60, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn track_link(track: &Track) -> String {
    if track.page_url.is_empty() {
        format!("**{}**", track.title)
    } else {
        format!("**[{}]({})**", track.title, track.page_url)
    }
}

pub fn create_track_added_embed(track: &Track, position: usize, started: bool) -> CreateEmbed {
    let title = if started {
        "🎵 Now Playing"
    } else {
        "🎵 Added to Queue"
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(track_link(track))
        .color(colors::INFO_BLUE)
        .field("Requested by", format!("<@{}>", track.requested_by), true);

    if !started {
        embed = embed.field("Position in queue", position.to_string(), true);
    }

    if track.duration_secs > 0 {
        embed = embed.field("Duration", format_duration(track.duration_secs), true);
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_now_playing_embed(snapshot: &PlayerSnapshot) -> CreateEmbed {
    let Some(track) = &snapshot.current else {
        return create_error_embed("Nothing is currently playing!");
    };

    let title = match snapshot.state {
        PlaybackState::Paused => "⏸️ Paused",
        _ => "🎵 Now Playing",
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(track_link(track))
        .color(colors::INFO_BLUE)
        .field("Requested by", format!("<@{}>", track.requested_by), true)
        .field("Volume", format!("{}%", (snapshot.volume * 100.0).round() as u32), true)
        .field(
            "Loop",
            if snapshot.loop_current {
                "✅ Enabled"
            } else {
                "❌ Disabled"
            },
            true,
        );

    if track.duration_secs > 0 {
        embed = embed.field("Duration", format_duration(track.duration_secs), true);
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_queue_embed(snapshot: &PlayerSnapshot, page: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Music Queue")
        .color(colors::INFO_BLUE);

    if snapshot.current.is_none() && snapshot.queue.is_empty() {
        return embed
            .description("The queue is empty! Use `/play <song>` to add music.")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    if let Some(current) = &snapshot.current {
        embed = embed.field(
            if snapshot.loop_current {
                "🔂 Now Playing"
            } else {
                "Now Playing"
            },
            format!("{}\nRequested by: <@{}>", track_link(current), current.requested_by),
            false,
        );
    }

    let queue_page = snapshot.page(page, QUEUE_PAGE_SIZE);
    if !queue_page.items.is_empty() {
        let listing = queue_page
            .items
            .iter()
            .enumerate()
            .map(|(i, track)| format!("{}. {}", queue_page.first_position + i, track_link(track)))
            .collect::<Vec<_>>()
            .join("\n");

        embed = embed.field(
            format!("Up Next ({} songs)", queue_page.total_items),
            listing,
            false,
        );

        let shown_until = queue_page.first_position + queue_page.items.len() - 1;
        if queue_page.total_items > shown_until {
            embed = embed.field(
                "\u{200b}",
                format!("... and {} more songs", queue_page.total_items - shown_until),
                false,
            );
        }
    }

    embed.footer(CreateEmbedFooter::new(format!(
        "Page {}/{} • Total queued: {}",
        queue_page.current_page,
        queue_page.total_pages,
        format_duration(snapshot.queued_duration.as_secs())
    )))
}

pub fn create_history_embed(entries: &[HistoryEntry]) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("📜 Recently Played")
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER));

    if entries.is_empty() {
        return embed
            .description("No songs have been played yet.")
            .color(colors::NEUTRAL_GRAY);
    }

    let listing = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}. **{}** ({}) by <@{}> <t:{}:R>",
                i + 1,
                entry.title,
                format_duration(entry.duration_secs),
                entry.user_id,
                entry.played_at.timestamp()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    embed.description(listing)
}

pub fn create_success_embed(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colors::SUCCESS_GREEN)
}

pub fn create_warning_embed(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colors::WARNING_ORANGE)
}

pub fn create_error_embed(message: impl std::fmt::Display) -> CreateEmbed {
    CreateEmbed::default()
        .description(format!("❌ {}", message))
        .color(colors::ERROR_RED)
}
