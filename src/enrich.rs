use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::art::ArtFetcher;
use crate::error::TrackError;
use crate::lyrics::{self, LyricsProvider};
use crate::track::{clean_title, EnrichedTrack, RawTrackState};

const DEFAULT_LYRICS_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// What to do when lyrics cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LyricsPolicy {
    /// Fail the whole enrichment.
    #[default]
    Required,
    /// Log and carry on with empty lyrics.
    Optional,
}

/// Turns a raw snapshot into an `EnrichedTrack`.
#[derive(Clone)]
pub struct Enricher {
    lyrics: Arc<dyn LyricsProvider>,
    art: Arc<dyn ArtFetcher>,
    lyrics_attempts: u32,
    retry_backoff: Duration,
    lyrics_policy: LyricsPolicy,
}

impl Enricher {
    pub fn new(lyrics: Arc<dyn LyricsProvider>, art: Arc<dyn ArtFetcher>) -> Self {
        Self {
            lyrics,
            art,
            lyrics_attempts: DEFAULT_LYRICS_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            lyrics_policy: LyricsPolicy::default(),
        }
    }

    pub fn with_lyrics_attempts(mut self, attempts: u32) -> Self {
        self.lyrics_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_lyrics_policy(mut self, policy: LyricsPolicy) -> Self {
        self.lyrics_policy = policy;
        self
    }

    /// Clean the title, then look up lyrics and art concurrently. Both are
    /// needed; if both fail the lyrics error is the one returned.
    pub async fn enrich(&self, raw: RawTrackState) -> Result<EnrichedTrack, TrackError> {
        let cleaned_title = clean_title(raw.title());

        let (lyrics, art) = tokio::join!(
            lyrics::lookup_with_retry(
                self.lyrics.as_ref(),
                &cleaned_title,
                raw.artist(),
                self.lyrics_attempts,
                self.retry_backoff,
            ),
            self.art.fetch_art(raw.album_art()),
        );

        let lyrics = match (lyrics, self.lyrics_policy) {
            (Ok(lyrics), _) => lyrics,
            (Err(e), LyricsPolicy::Optional) => {
                warn!("continuing without lyrics: {e}");
                String::new()
            }
            (Err(e), LyricsPolicy::Required) => return Err(e),
        };
        let art = art?;

        Ok(EnrichedTrack::new(raw, cleaned_title, lyrics, art))
    }
}
