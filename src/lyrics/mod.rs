pub mod api;
pub mod parser;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TrackError;

/// Something that can find the lyrics of a song.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// `Ok(None)` is a definitive miss; `Err` is a provider failure worth retrying.
    async fn search_lyrics(&self, title: &str, artist: &str) -> anyhow::Result<Option<String>>;
}

/// Ask `provider` up to `attempts` times. Only failures are retried; a miss
/// is returned right away as `LyricsUnavailable`.
pub async fn lookup_with_retry(
    provider: &dyn LyricsProvider,
    title: &str,
    artist: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<String, TrackError> {
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match provider.search_lyrics(title, artist).await {
            Ok(Some(lyrics)) => {
                debug!(title, artist, attempt, "lyrics found");
                return Ok(lyrics);
            }
            Ok(None) => {
                return Err(TrackError::lyrics_unavailable(title, artist, "no matching song"));
            }
            Err(e) => {
                warn!(title, artist, attempt, attempts, "lyrics lookup failed: {e:#}");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(backoff * attempt).await;
                }
            }
        }
    }

    let reason = last_error
        .map(|e| format!("{e:#}"))
        .unwrap_or_else(|| "no attempt made".to_string());
    Err(TrackError::lyrics_unavailable(
        title,
        artist,
        format!("gave up after {attempts} attempts: {reason}"),
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    pub response: SearchResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub hit_type: String,
    pub result: SongResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongResult {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub lyrics_state: Option<String>,
    #[serde(default)]
    pub primary_artist: Option<PrimaryArtist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrimaryArtist {
    pub name: String,
}

impl SongResult {
    pub fn artist_name(&self) -> &str {
        self.primary_artist
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("")
    }

    pub fn has_lyrics_page(&self) -> bool {
        !self.url.is_empty()
    }
}

impl SearchResults {
    /// Song hit by the requested artist if any, else the first song hit.
    pub fn best_match(&self, artist: &str) -> Option<&SongResult> {
        let mut songs = self
            .hits
            .iter()
            .filter(|hit| hit.hit_type == "song")
            .map(|hit| &hit.result)
            .filter(|song| song.has_lyrics_page());

        let first = songs.clone().next();
        songs
            .find(|song| song.artist_name().eq_ignore_ascii_case(artist.trim()))
            .or(first)
    }
}
