use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::PlayerError;

/// Callback de fin de reproducción. Recibe `Some(error)` si la pista falló.
pub type OnFinished = Box<dyn FnOnce(Option<String>) + Send + 'static>;

/// Fuente de audio a entregar al transporte.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub stream_url: String,
    pub volume: f32,
}

/// Sesión de salida de audio hacia un canal de voz.
///
/// `play` debe invocar `on_finished` exactamente una vez por llamada exitosa,
/// de forma asíncrona. Si `play` devuelve error el callback no se invoca.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn play(&self, source: AudioSource, on_finished: OnFinished) -> Result<(), PlayerError>;
    async fn pause(&self) -> Result<(), PlayerError>;
    async fn resume(&self) -> Result<(), PlayerError>;
    async fn stop(&self) -> Result<(), PlayerError>;
    async fn is_playing(&self) -> bool;
    async fn is_paused(&self) -> bool;
    async fn set_volume(&self, volume: f32) -> Result<(), PlayerError>;
}

/// Transporte sobre una llamada de songbird.
pub struct SongbirdTransport {
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdTransport {
    pub fn new(call: Arc<tokio::sync::Mutex<Call>>, http: reqwest::Client) -> Self {
        Self {
            call,
            http,
            current: Mutex::new(None),
        }
    }

    fn handle(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let handle = self.handle()?;
        handle.get_info().await.ok().map(|info| info.playing)
    }
}

fn transport_err(e: impl std::fmt::Display) -> PlayerError {
    PlayerError::Transport(e.to_string())
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn play(&self, source: AudioSource, on_finished: OnFinished) -> Result<(), PlayerError> {
        let input: Input = HttpRequest::new(self.http.clone(), source.stream_url.clone()).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let notifier = TrackEndNotifier {
            on_finished: Arc::new(Mutex::new(Some(on_finished))),
        };

        let registered = handle
            .set_volume(source.volume)
            .and_then(|_| handle.add_event(Event::Track(TrackEvent::End), notifier.clone()))
            .and_then(|_| handle.add_event(Event::Track(TrackEvent::Error), notifier));

        if let Err(e) = registered {
            // Sin handlers la cola quedaría detenida
            let _ = handle.stop();
            error!("❌ Could not set up track: {}", e);
            return Err(transport_err(e));
        }

        debug!("🎧 Track handed to songbird at volume {:.2}", source.volume);
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        let handle = self.handle().ok_or(PlayerError::NothingPlaying)?;
        handle.pause().map_err(transport_err)?;
        info!("⏸️ Playback paused");
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        let handle = self.handle().ok_or(PlayerError::NothingPaused)?;
        handle.play().map_err(transport_err)?;
        info!("▶️ Playback resumed");
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        if let Some(handle) = self.handle() {
            // El evento End resultante dispara el avance de la cola
            if let Err(e) = handle.stop() {
                warn!("Track already finished: {}", e);
            }
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }

    async fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        if let Some(handle) = self.handle() {
            handle.set_volume(volume).map_err(transport_err)?;
        }
        Ok(())
    }
}

/// Dispara `on_finished` una sola vez, sea por End o por Error.
#[derive(Clone)]
struct TrackEndNotifier {
    on_finished: Arc<Mutex<Option<OnFinished>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{:?}", e)),
                _ => None,
            }),
            _ => None,
        };

        if let Some(callback) = self.on_finished.lock().take() {
            callback(error);
        }

        None
    }
}
