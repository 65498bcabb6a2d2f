//! # Audio Module
//!
//! Per-guild music playback for PulseForge.
//!
//! ## Architecture
//!
//! ### [`player`] - Guild Music Player
//! - Owns the queue, the current track, loop mode and volume of one guild
//! - Chains playback through the transport's completion callback
//! - Serializes every queue advance per guild; stale completions are dropped
//!
//! ### [`queue`] - Queue Management
//! - FIFO queue with removal by index, clear and shuffle
//!
//! ### [`transport`] - Voice Transport
//! - Trait seam for the voice channel audio session
//! - Songbird implementation over `HttpRequest` inputs
//!
//! ### [`registry`] - Player Registry
//! - Lazily creates one player per guild, resets it on disconnect
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! # use std::sync::Arc;
//! # use serenity::all::GuildId;
//! # use pulseforge::audio::{player::PlayerSettings, registry::PlayerRegistry, transport::VoiceTransport};
//! # async fn example(history: Arc<dyn pulseforge::storage::HistoryRecorder>, voice: Arc<dyn VoiceTransport>, track: pulseforge::audio::queue::Track) -> anyhow::Result<()> {
//! let registry = PlayerRegistry::new(PlayerSettings::default(), history);
//! let player = registry.get_or_create(GuildId::new(123456789));
//! player.attach_transport(&voice);
//!
//! player.play(track).await?;
//! player.pause().await?;
//! player.resume().await?;
//! player.stop().await?; // advances through the completion callback
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod player;
pub mod queue;
pub mod registry;
pub mod transport;
