use thiserror::Error;

/// Everything that can stop a track-info request.
///
/// `ZoneNotFound` and `NothingPlaying` are the benign outcomes: the service
/// answers them with the teapot status. The rest are real failures.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("No player named {0}.")]
    ZoneNotFound(String),

    #[error("The player at {0} is not playing anything.")]
    NothingPlaying(String),

    #[error("Lyrics unavailable for {title} by {artist}: {reason}")]
    LyricsUnavailable {
        title: String,
        artist: String,
        reason: String,
    },

    #[error("Album art unavailable at {url}: {reason}")]
    ArtUnavailable { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl TrackError {
    pub fn lyrics_unavailable(title: &str, artist: &str, reason: impl ToString) -> Self {
        TrackError::LyricsUnavailable {
            title: title.to_string(),
            artist: artist.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn art_unavailable(url: &str, reason: impl ToString) -> Self {
        TrackError::ArtUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for "no such zone" and "nothing playing".
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            TrackError::ZoneNotFound(_) | TrackError::NothingPlaying(_)
        )
    }
}
