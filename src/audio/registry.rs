use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    player::{GuildMusicPlayer, PlayerSettings},
    transport::VoiceTransport,
};
use crate::storage::HistoryRecorder;

/// Registro de reproductores por guild.
///
/// Los reproductores se crean al primer comando de música y se reinician en
/// sitio cuando termina la conexión de voz. El registro es dueño de las
/// sesiones de voz; cada reproductor solo guarda una referencia débil.
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<GuildMusicPlayer>>,
    sessions: DashMap<GuildId, Arc<dyn VoiceTransport>>,
    settings: PlayerSettings,
    history: Arc<dyn HistoryRecorder>,
}

impl PlayerRegistry {
    pub fn new(settings: PlayerSettings, history: Arc<dyn HistoryRecorder>) -> Self {
        Self {
            players: DashMap::new(),
            sessions: DashMap::new(),
            settings,
            history,
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildMusicPlayer> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                GuildMusicPlayer::spawn(guild_id, self.settings, self.history.clone())
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildMusicPlayer>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }

    /// Asocia una sesión de voz al reproductor de la guild.
    ///
    /// Si ya hay una sesión se reutiliza y `open` no se llama: la pista en
    /// curso sigue controlada por el transporte que la inició.
    pub fn connect(
        &self,
        guild_id: GuildId,
        open: impl FnOnce() -> Arc<dyn VoiceTransport>,
    ) -> Arc<dyn VoiceTransport> {
        let transport = self
            .sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🔊 Opening voice session for guild {}", guild_id);
                open()
            })
            .clone();

        self.get_or_create(guild_id).attach_transport(&transport);
        transport
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    /// Cierra la sesión de voz y reinicia el reproductor de la guild.
    /// Devuelve `false` si no existía.
    pub async fn disconnect(&self, guild_id: GuildId) -> bool {
        // La sesión sigue viva hasta que el reproductor detiene su pista
        let _session = self.sessions.remove(&guild_id);

        match self.get(guild_id) {
            Some(player) => {
                player.disconnect().await;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, guild_id: GuildId) -> Option<Arc<GuildMusicPlayer>> {
        self.disconnect(guild_id).await;
        let removed = self.players.remove(&guild_id).map(|(_, player)| player);
        if removed.is_some() {
            info!("🗑️ Player removed for guild {}", guild_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }
}
