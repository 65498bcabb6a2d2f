use rand::seq::SliceRandom;
use serenity::model::id::UserId;
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use super::error::PlayerError;

/// Pista resuelta y lista para reproducir. Inmutable una vez creada.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub stream_url: String,
    pub page_url: String,
    pub duration_secs: u64,
    pub thumbnail: Option<String>,
    pub requested_by: UserId,
}

impl Track {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Cola FIFO de pistas pendientes para una guild.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega una pista al final y devuelve su posición (1-based).
    pub fn push(&mut self, track: Track) -> Result<usize, PlayerError> {
        if self.items.len() >= self.max_size {
            return Err(PlayerError::QueueFull(self.max_size));
        }

        info!("➕ Added to queue: {}", track.title);
        self.items.push_back(track);
        Ok(self.items.len())
    }

    /// Saca la siguiente pista (FIFO estricto).
    pub fn pop_front(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        if let Some(ref track) = next {
            debug!("➡️ Next in queue: {}", track.title);
        }
        next
    }

    /// Elimina la pista en `index` (0-based) preservando el orden del resto.
    pub fn remove_at(&mut self, index: usize) -> Result<Track, PlayerError> {
        let len = self.items.len();
        match self.items.remove(index) {
            Some(track) => {
                debug!("❌ Removed track at position {}: {}", index, track.title);
                Ok(track)
            }
            None => Err(PlayerError::out_of_range(
                "queue index",
                index as i64,
                0,
                len as i64 - 1,
            )),
        }
    }

    pub fn clear(&mut self) -> usize {
        let cleared = self.items.len();
        self.items.clear();
        info!("🗑️ Queue cleared ({} tracks)", cleared);
        cleared
    }

    /// Permutación uniforme de la cola (Fisher-Yates).
    pub fn shuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.items.make_contiguous().shuffle(&mut rng);
        info!("🔀 Queue shuffled ({} tracks)", self.items.len());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    pub fn total_duration(&self) -> Duration {
        self.items.iter().map(Track::duration).sum()
    }
}

#[cfg(test)]
pub(crate) fn track(title: &str) -> Track {
    Track {
        title: title.to_string(),
        stream_url: format!("https://cdn.example.com/{title}.webm"),
        page_url: format!("https://www.youtube.com/watch?v={title}"),
        duration_secs: 180,
        thumbnail: None,
        requested_by: UserId::new(42),
    }
}
