//! Reproductor por guild.
//!
//! Cada [`GuildMusicPlayer`] mantiene la cola, la pista actual, el modo loop y
//! el volumen de una guild. El avance de la cola ocurre en dos caminos:
//! directamente desde el comando que encola (si el reproductor está inactivo)
//! o desde el callback de fin de pista del transporte. Ese callback solo
//! publica un [`Completion`] en el buzón de la guild; una tarea dedicada lo
//! consume y es la única que muta el estado en respuesta a él.
//!
//! Cada llamada a `play` lleva el número de generación vigente. Las
//! finalizaciones con una generación distinta (por ejemplo tras una
//! desconexión) se descartan.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serenity::model::id::GuildId;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    error::PlayerError,
    queue::{MusicQueue, Track},
    transport::{AudioSource, OnFinished, VoiceTransport},
};
use crate::storage::{HistoryEntry, HistoryRecorder};

#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub default_volume: f32,
    pub max_queue_size: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_volume: 0.5,
            max_queue_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Resultado de [`GuildMusicPlayer::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    pub position: usize,
    pub started: bool,
}

#[derive(Debug)]
struct PlayerState {
    queue: MusicQueue,
    current: Option<Track>,
    loop_current: bool,
    volume: f32,
    paused: bool,
    generation: u64,
}

impl PlayerState {
    fn playback_state(&self) -> PlaybackState {
        match (&self.current, self.paused) {
            (None, _) => PlaybackState::Idle,
            (Some(_), true) => PlaybackState::Paused,
            (Some(_), false) => PlaybackState::Playing,
        }
    }
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    error: Option<String>,
}

pub struct GuildMusicPlayer {
    guild_id: GuildId,
    state: Mutex<PlayerState>,
    transport: RwLock<Option<Weak<dyn VoiceTransport>>>,
    history: Arc<dyn HistoryRecorder>,
    // Serializa todos los avances de esta guild
    turn: tokio::sync::Mutex<()>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl GuildMusicPlayer {
    /// Crea el reproductor y lanza la tarea que consume su buzón de
    /// finalizaciones. Requiere un runtime de tokio activo.
    pub fn spawn(
        guild_id: GuildId,
        settings: PlayerSettings,
        history: Arc<dyn HistoryRecorder>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let player = Arc::new(Self {
            guild_id,
            state: Mutex::new(PlayerState {
                queue: MusicQueue::new(settings.max_queue_size),
                current: None,
                loop_current: false,
                volume: settings.default_volume,
                paused: false,
                generation: 0,
            }),
            transport: RwLock::new(None),
            history,
            turn: tokio::sync::Mutex::new(()),
            completions: tx,
        });

        tokio::spawn(drive_completions(Arc::downgrade(&player), rx));
        debug!("🎛️ Player created for guild {}", guild_id);

        player
    }

    /// Asocia la sesión de voz activa. Solo se guarda una referencia débil.
    pub fn attach_transport(&self, transport: &Arc<dyn VoiceTransport>) {
        *self.transport.write() = Some(Arc::downgrade(transport));
        info!("🔊 Voice transport attached for guild {}", self.guild_id);
    }

    fn transport(&self) -> Option<Arc<dyn VoiceTransport>> {
        self.transport.read().as_ref().and_then(Weak::upgrade)
    }

    /// Agrega una pista a la cola y devuelve su posición (1-based).
    pub fn enqueue(&self, track: Track) -> Result<usize, PlayerError> {
        self.state.lock().queue.push(track)
    }

    /// Encola y, si no hay nada sonando, arranca la reproducción.
    pub async fn play(&self, track: Track) -> Result<Enqueued, PlayerError> {
        let _turn = self.turn.lock().await;

        let position = self.enqueue(track)?;
        let idle = self.state.lock().current.is_none();

        let started = idle && self.advance_locked().await.is_some();
        Ok(Enqueued { position, started })
    }

    pub fn remove_at(&self, index: usize) -> Result<Track, PlayerError> {
        self.state.lock().queue.remove_at(index)
    }

    /// Vacía la cola sin tocar la pista actual.
    pub fn clear(&self) -> usize {
        self.state.lock().queue.clear()
    }

    /// Mezcla la cola. Devuelve `false` si estaba vacía.
    pub fn shuffle(&self) -> bool {
        let mut state = self.state.lock();
        if state.queue.is_empty() {
            return false;
        }
        state.queue.shuffle();
        true
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn set_loop(&self, enabled: bool) {
        self.state.lock().loop_current = enabled;
        if enabled {
            info!("🔂 Loop enabled for guild {}", self.guild_id);
        } else {
            info!("➡️ Loop disabled for guild {}", self.guild_id);
        }
    }

    pub fn toggle_loop(&self) -> bool {
        let enabled = !self.state.lock().loop_current;
        self.set_loop(enabled);
        enabled
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// Ajusta el volumen (0-100) y lo aplica a la fuente en curso sin reiniciarla.
    pub async fn set_volume(&self, percent: i64) -> Result<f32, PlayerError> {
        if !(0..=100).contains(&percent) {
            return Err(PlayerError::out_of_range("volume", percent, 0, 100));
        }

        let volume = percent as f32 / 100.0;
        self.state.lock().volume = volume;

        if let Some(transport) = self.transport() {
            if let Err(e) = transport.set_volume(volume).await {
                warn!("⚠️ Could not apply volume to live source: {}", e);
            }
        }

        info!("🔊 Volume set to {}% in guild {}", percent, self.guild_id);
        Ok(volume)
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        let transport = self.transport().ok_or(PlayerError::NotConnected)?;
        if !transport.is_playing().await {
            return Err(PlayerError::NothingPlaying);
        }

        transport.pause().await?;
        self.state.lock().paused = true;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        let transport = self.transport().ok_or(PlayerError::NotConnected)?;
        if !transport.is_paused().await {
            return Err(PlayerError::NothingPaused);
        }

        transport.resume().await?;
        self.state.lock().paused = false;
        Ok(())
    }

    /// Detiene la pista actual. El avance llega por el callback del
    /// transporte, nunca desde este marco de pila.
    pub async fn stop(&self) -> Result<(), PlayerError> {
        let transport = self.transport().ok_or(PlayerError::NotConnected)?;
        transport.stop().await?;
        info!("⏹️ Stop requested in guild {}", self.guild_id);
        Ok(())
    }

    /// Reinicia el reproductor al terminar la conexión de voz y abandona la
    /// pista en curso. Su finalización llega con una generación vieja y se
    /// descarta.
    pub async fn disconnect(&self) {
        let _turn = self.turn.lock().await;

        let transport = self.transport.write().take().and_then(|weak| weak.upgrade());
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.current = None;
            state.paused = false;
            state.generation += 1;
        }

        if let Some(transport) = transport {
            if let Err(e) = transport.stop().await {
                warn!("⚠️ Could not stop track on disconnect in guild {}: {}", self.guild_id, e);
            }
        }
        info!("🔌 Player reset for guild {}", self.guild_id);
    }

    pub fn state(&self) -> PlaybackState {
        self.state.lock().playback_state()
    }

    pub fn current(&self) -> Option<Track> {
        self.state.lock().current.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let state = self.state.lock();
        PlayerSnapshot {
            state: state.playback_state(),
            current: state.current.clone(),
            queue: state.queue.iter().cloned().collect(),
            loop_current: state.loop_current,
            volume: state.volume,
            queued_duration: state.queue.total_duration(),
        }
    }

    /// Pasa a la siguiente pista (o repite la actual en modo loop).
    ///
    /// Sin transporte de voz no hace nada: la cola no se consume y devuelve
    /// `None`, así las pistas encoladas antes de `/join` se conservan.
    pub async fn advance(&self) -> Option<Track> {
        let _turn = self.turn.lock().await;
        self.advance_locked().await
    }

    async fn advance_locked(&self) -> Option<Track> {
        loop {
            let Some(transport) = self.transport() else {
                debug!("No voice transport for guild {}, not advancing", self.guild_id);
                return None;
            };

            let (track, volume, generation) = {
                let mut state = self.state.lock();
                state.paused = false;

                if !(state.loop_current && state.current.is_some()) {
                    state.current = state.queue.pop_front();
                }

                let Some(track) = state.current.clone() else {
                    info!("📭 Queue drained for guild {}", self.guild_id);
                    return None;
                };

                state.generation += 1;
                (track, state.volume, state.generation)
            };

            let source = AudioSource {
                stream_url: track.stream_url.clone(),
                volume,
            };

            match transport.play(source, self.completion_callback(generation)).await {
                Ok(()) => {
                    info!("🎵 Now playing in guild {}: {}", self.guild_id, track.title);
                    return Some(track);
                }
                Err(e) => {
                    error!("❌ Skipping `{}` in guild {}: {}", track.title, self.guild_id, e);
                    let mut state = self.state.lock();
                    // Una pista que no se puede reproducir no se repite
                    if state.generation == generation {
                        state.current = None;
                    }
                }
            }
        }
    }

    fn completion_callback(&self, generation: u64) -> OnFinished {
        let mailbox = self.completions.clone();
        Box::new(move |error| {
            let _ = mailbox.send(Completion { generation, error });
        })
    }

    async fn on_track_finished(&self, completion: Completion) {
        let _turn = self.turn.lock().await;

        let finished = {
            let mut state = self.state.lock();
            if completion.generation != state.generation {
                debug!(
                    "Ignoring stale completion {} in guild {} (current {})",
                    completion.generation, self.guild_id, state.generation
                );
                return;
            }

            state.paused = false;
            let finished = state.current.clone();
            if completion.error.is_some() {
                state.current = None;
            }
            finished
        };

        match (completion.error, finished) {
            (None, Some(track)) => self.record_history(&track),
            (Some(e), track) => error!(
                "❌ Playback error in guild {} ({}): {}",
                self.guild_id,
                track.map(|t| t.title).unwrap_or_default(),
                e
            ),
            (None, None) => {}
        }

        self.advance_locked().await;
    }

    fn record_history(&self, track: &Track) {
        let entry = HistoryEntry {
            guild_id: self.guild_id.get(),
            user_id: track.requested_by.get(),
            title: track.title.clone(),
            url: track.page_url.clone(),
            duration_secs: track.duration_secs,
            played_at: Utc::now(),
        };

        let recorder = self.history.clone();
        tokio::spawn(async move {
            if let Err(e) = recorder.record(entry).await {
                warn!("⚠️ Could not record music history: {:?}", e);
            }
        });
    }
}

async fn drive_completions(
    player: Weak<GuildMusicPlayer>,
    mut rx: mpsc::UnboundedReceiver<Completion>,
) {
    while let Some(completion) = rx.recv().await {
        let Some(player) = player.upgrade() else {
            break;
        };
        player.on_track_finished(completion).await;
    }
}

/// Vista inmutable del reproductor para las respuestas del bot.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub loop_current: bool,
    pub volume: f32,
    pub queued_duration: Duration,
}

impl PlayerSnapshot {
    /// Obtiene una página específica de la cola
    pub fn page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let items_per_page = items_per_page.max(1);
        let total_items = self.queue.len();
        let total_pages = if total_items == 0 {
            1
        } else {
            (total_items + items_per_page - 1) / items_per_page
        };
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * items_per_page;
        let end = (start + items_per_page).min(total_items);

        QueuePage {
            items: self.queue[start..end].to_vec(),
            first_position: start + 1,
            current_page,
            total_pages,
            total_items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub first_position: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::queue::track;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub(crate) struct FakeTransport {
        played: Mutex<Vec<AudioSource>>,
        pending: Mutex<Option<OnFinished>>,
        failing: Mutex<Vec<String>>,
        playing: AtomicBool,
        paused: AtomicBool,
        volume: Mutex<Option<f32>>,
    }

    impl FakeTransport {
        pub(crate) fn fail_on(&self, track: &Track) {
            self.failing.lock().push(track.stream_url.clone());
        }

        pub(crate) fn plays(&self) -> usize {
            self.played.lock().len()
        }

        pub(crate) fn volume(&self) -> Option<f32> {
            *self.volume.lock()
        }

        pub(crate) fn last_played(&self) -> Option<AudioSource> {
            self.played.lock().last().cloned()
        }

        /// Simula el fin de la pista en curso.
        pub(crate) fn finish(&self, error: Option<&str>) {
            let callback = self.pending.lock().take().expect("no track in flight");
            self.playing.store(false, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            callback(error.map(str::to_string));
        }
    }

    #[async_trait]
    impl VoiceTransport for FakeTransport {
        async fn play(&self, source: AudioSource, on_finished: OnFinished) -> Result<(), PlayerError> {
            if self.failing.lock().contains(&source.stream_url) {
                return Err(PlayerError::Transport("unsupported codec".into()));
            }
            self.played.lock().push(source);
            *self.pending.lock() = Some(on_finished);
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn pause(&self) -> Result<(), PlayerError> {
            self.playing.store(false, Ordering::SeqCst);
            self.paused.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> Result<(), PlayerError> {
            self.playing.store(true, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), PlayerError> {
            if self.pending.lock().is_some() {
                self.finish(None);
            }
            Ok(())
        }

        async fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        async fn is_paused(&self) -> bool {
            self.paused.load(Ordering::SeqCst)
        }

        async fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
            *self.volume.lock() = Some(volume);
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingHistory {
        pub(crate) entries: Mutex<Vec<HistoryEntry>>,
    }

    #[async_trait]
    impl HistoryRecorder for RecordingHistory {
        async fn record(&self, entry: HistoryEntry) -> anyhow::Result<()> {
            self.entries.lock().push(entry);
            Ok(())
        }
    }

    struct FailingHistory;

    #[async_trait]
    impl HistoryRecorder for FailingHistory {
        async fn record(&self, _entry: HistoryEntry) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    pub(crate) async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..400 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    fn setup() -> (Arc<GuildMusicPlayer>, Arc<FakeTransport>, Arc<RecordingHistory>) {
        let transport = Arc::new(FakeTransport::default());
        let history = Arc::new(RecordingHistory::default());
        let player =
            GuildMusicPlayer::spawn(GuildId::new(1), PlayerSettings::default(), history.clone());
        let voice: Arc<dyn VoiceTransport> = transport.clone();
        player.attach_transport(&voice);
        (player, transport, history)
    }

    fn current_title(player: &GuildMusicPlayer) -> Option<String> {
        player.current().map(|t| t.title)
    }

    fn queue_titles(player: &GuildMusicPlayer) -> Vec<String> {
        player.snapshot().queue.into_iter().map(|t| t.title).collect()
    }

    #[tokio::test]
    async fn plays_queue_in_order_until_idle() {
        let (player, transport, history) = setup();
        for name in ["A", "B", "C"] {
            player.enqueue(track(name)).unwrap();
        }

        assert_eq!(player.advance().await.unwrap().title, "A");
        assert_eq!(queue_titles(&player), vec!["B", "C"]);
        assert_eq!(player.state(), PlaybackState::Playing);

        transport.finish(None);
        eventually(|| current_title(&player).as_deref() == Some("B")).await;
        assert_eq!(queue_titles(&player), vec!["C"]);

        transport.finish(None);
        eventually(|| current_title(&player).as_deref() == Some("C")).await;
        assert!(queue_titles(&player).is_empty());

        transport.finish(None);
        eventually(|| player.state() == PlaybackState::Idle).await;
        assert_eq!(player.current(), None);
        assert_eq!(transport.plays(), 3);

        eventually(|| history.entries.lock().len() == 3).await;
        let recorded: Vec<_> = history.entries.lock().iter().map(|e| e.title.clone()).collect();
        assert_eq!(recorded, vec!["A", "B", "C"]);
        let first = history.entries.lock()[0].clone();
        assert_eq!(first.guild_id, 1);
        assert_eq!(first.user_id, 42);
        assert_eq!(first.url, "https://www.youtube.com/watch?v=A");
        assert_eq!(first.duration_secs, 180);
    }

    #[tokio::test]
    async fn advance_on_empty_player_stays_idle() {
        let (player, transport, _history) = setup();

        assert_eq!(player.advance().await, None);
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(transport.plays(), 0);
    }

    #[tokio::test]
    async fn loop_replays_current_without_consuming_queue() {
        let (player, transport, _history) = setup();
        player.enqueue(track("B")).unwrap();
        player.enqueue(track("C")).unwrap();
        player.advance().await;
        player.set_loop(true);

        for expected_plays in 2..=4 {
            transport.finish(None);
            eventually(|| transport.plays() == expected_plays).await;
            assert_eq!(current_title(&player).as_deref(), Some("B"));
            assert_eq!(queue_titles(&player), vec!["C"]);
        }

        let replayed = transport.last_played().unwrap();
        assert_eq!(replayed.stream_url, track("B").stream_url);
    }

    #[tokio::test]
    async fn toggle_loop_flips_flag() {
        let (player, _transport, _history) = setup();
        assert!(player.toggle_loop());
        assert!(player.snapshot().loop_current);
        assert!(!player.toggle_loop());
    }

    #[tokio::test]
    async fn volume_outside_range_is_rejected() {
        let (player, transport, _history) = setup();

        for bad in [150, -1, 101] {
            let err = player.set_volume(bad).await.unwrap_err();
            assert!(matches!(err, PlayerError::OutOfRange { value, .. } if value == bad));
        }
        assert_eq!(player.volume(), 0.5);
        assert_eq!(*transport.volume.lock(), None);
    }

    #[tokio::test]
    async fn volume_reaches_live_source_and_next_track() {
        let (player, transport, _history) = setup();
        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.advance().await;
        assert_eq!(transport.last_played().unwrap().volume, 0.5);

        assert_eq!(player.set_volume(80).await.unwrap(), 0.8);
        assert_eq!(*transport.volume.lock(), Some(0.8));
        assert_eq!(transport.plays(), 1);

        transport.finish(None);
        eventually(|| transport.plays() == 2).await;
        assert_eq!(transport.last_played().unwrap().volume, 0.8);
    }

    #[tokio::test]
    async fn failing_track_is_skipped() {
        let (player, transport, history) = setup();
        let bad = track("broken");
        transport.fail_on(&bad);
        player.enqueue(bad).unwrap();
        player.enqueue(track("C")).unwrap();

        assert_eq!(player.advance().await.unwrap().title, "C");
        assert_eq!(transport.plays(), 1);
        assert!(queue_titles(&player).is_empty());
        assert!(history.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn failing_track_is_not_looped() {
        let (player, transport, _history) = setup();
        let bad = track("broken");
        transport.fail_on(&bad);
        player.set_loop(true);
        player.enqueue(bad).unwrap();

        assert_eq!(player.advance().await, None);
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(transport.plays(), 0);
    }

    #[tokio::test]
    async fn playback_error_skips_history_and_continues() {
        let (player, transport, history) = setup();
        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.set_loop(true);
        player.advance().await;

        transport.finish(Some("decoder error"));
        eventually(|| current_title(&player).as_deref() == Some("B")).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(history.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn disconnect_abandons_track_and_ignores_its_completion() {
        let (player, transport, history) = setup();
        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.advance().await;
        assert!(transport.is_playing().await);

        player.disconnect().await;
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(queue_titles(&player).is_empty());
        assert!(!transport.is_playing().await);

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(transport.plays(), 1);
        assert!(history.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn stale_generation_is_ignored() {
        let (player, transport, _history) = setup();
        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.advance().await;

        player
            .completions
            .send(Completion {
                generation: 0,
                error: None,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(current_title(&player).as_deref(), Some("A"));
        assert_eq!(transport.plays(), 1);
    }

    #[tokio::test]
    async fn play_starts_only_when_idle() {
        let (player, transport, _history) = setup();

        let first = player.play(track("A")).await.unwrap();
        assert_eq!(first, Enqueued { position: 1, started: true });

        let second = player.play(track("B")).await.unwrap();
        assert_eq!(second, Enqueued { position: 1, started: false });

        assert_eq!(current_title(&player).as_deref(), Some("A"));
        assert_eq!(queue_titles(&player), vec!["B"]);
        assert_eq!(transport.plays(), 1);
    }

    #[tokio::test]
    async fn pause_and_resume_follow_transport_state() {
        let (player, _transport, _history) = setup();
        assert_eq!(player.pause().await, Err(PlayerError::NothingPlaying));

        player.play(track("A")).await.unwrap();
        assert_eq!(player.resume().await, Err(PlayerError::NothingPaused));

        player.pause().await.unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(player.pause().await, Err(PlayerError::NothingPlaying));

        player.resume().await.unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn stop_advances_through_completion_path() {
        let (player, transport, _history) = setup();
        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.advance().await;

        player.stop().await.unwrap();
        eventually(|| current_title(&player).as_deref() == Some("B")).await;
        assert_eq!(transport.plays(), 2);
    }

    #[tokio::test]
    async fn controls_require_transport() {
        let player = GuildMusicPlayer::spawn(
            GuildId::new(5),
            PlayerSettings::default(),
            Arc::new(RecordingHistory::default()),
        );
        player.enqueue(track("A")).unwrap();

        assert_eq!(player.pause().await, Err(PlayerError::NotConnected));
        assert_eq!(player.resume().await, Err(PlayerError::NotConnected));
        assert_eq!(player.stop().await, Err(PlayerError::NotConnected));
        assert_eq!(player.advance().await, None);
        assert_eq!(queue_titles(&player), vec!["A"]);
    }

    #[tokio::test]
    async fn dropped_transport_counts_as_disconnected() {
        let player = GuildMusicPlayer::spawn(
            GuildId::new(6),
            PlayerSettings::default(),
            Arc::new(RecordingHistory::default()),
        );
        {
            let voice: Arc<dyn VoiceTransport> = Arc::new(FakeTransport::default());
            player.attach_transport(&voice);
        }
        assert_eq!(player.stop().await, Err(PlayerError::NotConnected));
    }

    #[tokio::test]
    async fn history_failure_does_not_stall_queue() {
        let transport = Arc::new(FakeTransport::default());
        let player =
            GuildMusicPlayer::spawn(GuildId::new(2), PlayerSettings::default(), Arc::new(FailingHistory));
        let voice: Arc<dyn VoiceTransport> = transport.clone();
        player.attach_transport(&voice);

        player.enqueue(track("A")).unwrap();
        player.enqueue(track("B")).unwrap();
        player.advance().await;

        transport.finish(None);
        eventually(|| current_title(&player).as_deref() == Some("B")).await;
    }

    #[tokio::test]
    async fn queue_full_is_reported() {
        let settings = PlayerSettings {
            default_volume: 0.5,
            max_queue_size: 1,
        };
        let player =
            GuildMusicPlayer::spawn(GuildId::new(3), settings, Arc::new(RecordingHistory::default()));
        player.enqueue(track("A")).unwrap();
        assert_eq!(player.enqueue(track("B")), Err(PlayerError::QueueFull(1)));
    }

    #[tokio::test]
    async fn snapshot_pages_queue() {
        let (player, _transport, _history) = setup();
        for i in 0..23 {
            player.enqueue(track(&format!("t{i}"))).unwrap();
        }

        let snapshot = player.snapshot();
        let page = snapshot.page(3, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.first_position, 21);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].title, "t20");

        let clamped = snapshot.page(9, 10);
        assert_eq!(clamped.current_page, 3);

        let empty = GuildMusicPlayer::spawn(
            GuildId::new(4),
            PlayerSettings::default(),
            Arc::new(RecordingHistory::default()),
        )
        .snapshot()
        .page(1, 10);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn shuffle_reports_empty_queue() {
        let (player, _transport, _history) = setup();
        assert!(!player.shuffle());

        for name in ["A", "B", "C", "D"] {
            player.enqueue(track(name)).unwrap();
        }
        assert!(player.shuffle());
        assert_eq!(player.queue_len(), 4);

        let mut titles = queue_titles(&player);
        titles.sort();
        assert_eq!(titles, vec!["A", "B", "C", "D"]);
    }
}
