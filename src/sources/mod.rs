pub mod ytdlp;

use async_trait::async_trait;
use serenity::model::id::UserId;

use crate::audio::{error::PlayerError, queue::Track};

pub use ytdlp::YtDlpResolver;

/// Convierte una URL o búsqueda del usuario en una pista reproducible.
///
/// Es una operación lenta (proceso externo o red): nunca se ejecuta
/// mientras se mantiene el turno de un reproductor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, PlayerError>;
}

/// Verifica si la consulta es una URL http(s)
pub fn is_url(query: &str) -> bool {
    url::Url::parse(query)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
