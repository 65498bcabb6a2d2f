use thiserror::Error;

/// Errores del reproductor por guild.
///
/// `OutOfRange`, `NothingPlaying`, `NothingPaused`, `NotConnected` y
/// `QueueFull` se devuelven al llamador sin mutar el estado. `Transport`
/// durante `advance()` nunca llega al llamador: se registra y se salta la pista.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayerError {
    #[error("{what} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("nothing is currently playing")]
    NothingPlaying,

    #[error("nothing is currently paused")]
    NothingPaused,

    #[error("not connected to a voice channel")]
    NotConnected,

    #[error("the queue is full (max {0} tracks)")]
    QueueFull(usize),

    #[error("could not resolve `{query}`: {reason}")]
    ResolveFailed { query: String, reason: String },

    #[error("voice transport error: {0}")]
    Transport(String),
}

impl PlayerError {
    pub fn out_of_range(what: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            what,
            value,
            min,
            max,
        }
    }

    pub fn resolve_failed(query: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResolveFailed {
            query: query.into(),
            reason: reason.to_string(),
        }
    }
}
