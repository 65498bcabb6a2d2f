use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::{process::Stdio, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{is_url, TrackResolver};
use crate::audio::{error::PlayerError, queue::Track};

/// Resuelve pistas ejecutando yt-dlp en un proceso hijo.
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
}

/// Subconjunto del JSON que imprime `yt-dlp -j`
#[derive(Debug, Deserialize)]
struct VideoInfo {
    url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    entries: Vec<VideoInfo>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Búsquedas de texto se envían como `ytsearch1:`
    fn target(query: &str) -> String {
        if is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    async fn run(&self, query: &str) -> Result<String, PlayerError> {
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "-j",
                "--no-playlist",
                "--no-warnings",
                "--quiet",
                "-f",
                "bestaudio/best",
                "--socket-timeout",
                "30",
            ])
            .arg(Self::target(query))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, output)
            .await
            .map_err(|_| PlayerError::resolve_failed(query, "yt-dlp timed out"))?
            .map_err(|e| PlayerError::resolve_failed(query, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp failed for `{}`: {}", query, stderr.trim());
            return Err(PlayerError::resolve_failed(query, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Interpreta la salida de yt-dlp (una línea JSON por resultado).
fn parse_output(query: &str, stdout: &str, requested_by: UserId) -> Result<Track, PlayerError> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PlayerError::resolve_failed(query, "no results"))?;

    let mut info: VideoInfo =
        serde_json::from_str(line).map_err(|e| PlayerError::resolve_failed(query, e))?;

    if !info.entries.is_empty() {
        info = info.entries.remove(0);
    }

    let stream_url = info
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| PlayerError::resolve_failed(query, "no playable stream"))?;

    Ok(Track {
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        page_url: info.webpage_url.unwrap_or_default(),
        duration_secs: info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        thumbnail: info.thumbnail,
        requested_by,
        stream_url,
    })
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, PlayerError> {
        info!("🔍 Resolving: {}", query);
        let stdout = self.run(query).await?;
        let track = parse_output(query, &stdout, requested_by)?;
        debug!("✅ Resolved `{}` -> {}", query, track.title);
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VIDEO: &str = r#"{"id":"dQw4w9WgXcQ","title":"Never Gonna Give You Up","duration":212.0,"webpage_url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","thumbnail":"https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg","url":"https://rr1.googlevideo.com/videoplayback?id=1"}"#;

    #[test]
    fn parses_single_video() {
        let track = parse_output("rick", VIDEO, UserId::new(9)).unwrap();
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.duration_secs, 212);
        assert_eq!(track.page_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(track.stream_url, "https://rr1.googlevideo.com/videoplayback?id=1");
        assert_eq!(track.requested_by, UserId::new(9));
        assert!(track.thumbnail.is_some());
    }

    #[test]
    fn takes_first_entry_of_result_list() {
        let json = format!(r#"{{"title":"search","entries":[{}]}}"#, VIDEO);
        let track = parse_output("rick", &json, UserId::new(1)).unwrap();
        assert_eq!(track.title, "Never Gonna Give You Up");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let track = parse_output("x", r#"{"url":"https://cdn/x"}"#, UserId::new(1)).unwrap();
        assert_eq!(track.title, "Unknown");
        assert_eq!(track.duration_secs, 0);
        assert_eq!(track.page_url, "");
    }

    #[test]
    fn empty_or_streamless_output_is_not_found() {
        assert!(matches!(
            parse_output("x", "\n", UserId::new(1)),
            Err(PlayerError::ResolveFailed { .. })
        ));
        assert!(matches!(
            parse_output("x", r#"{"title":"no stream"}"#, UserId::new(1)),
            Err(PlayerError::ResolveFailed { .. })
        ));
        assert!(matches!(
            parse_output("x", "not json", UserId::new(1)),
            Err(PlayerError::ResolveFailed { .. })
        ));
    }

    #[test]
    fn search_terms_use_ytsearch() {
        assert_eq!(YtDlpResolver::target("lofi beats"), "ytsearch1:lofi beats");
        assert_eq!(
            YtDlpResolver::target("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[tokio::test]
    async fn missing_binary_fails_to_resolve() {
        let resolver = YtDlpResolver::new("definitely-not-yt-dlp-binary", Duration::from_secs(5));
        let err = resolver.resolve("anything", UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, PlayerError::ResolveFailed { .. }));
    }
}
