use image::DynamicImage;

use crate::error::TrackError;
use crate::zone::{self, ZoneController, ZoneHandle};

/// Playback fields exactly as a zone reports them. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_art: String,
    pub position: String, // h:mm:ss elapsed
    pub playlist_position: String,
    pub duration: String, // h:mm:ss
    pub uri: String,
    pub metadata: String, // raw DIDL-Lite, passed through untouched
}

/// Snapshot of a zone that is playing something. The title is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTrackState {
    info: PositionInfo,
}

impl RawTrackState {
    /// `None` when the payload carries no title: the zone is idle.
    pub fn from_position_info(info: PositionInfo) -> Option<Self> {
        if info.title.is_empty() {
            None
        } else {
            Some(Self { info })
        }
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn artist(&self) -> &str {
        &self.info.artist
    }

    pub fn album(&self) -> &str {
        &self.info.album
    }

    pub fn album_art(&self) -> &str {
        &self.info.album_art
    }

    pub fn position(&self) -> &str {
        &self.info.position
    }

    pub fn playlist_position(&self) -> &str {
        &self.info.playlist_position
    }

    pub fn duration(&self) -> &str {
        &self.info.duration
    }

    pub fn uri(&self) -> &str {
        &self.info.uri
    }

    pub fn metadata(&self) -> &str {
        &self.info.metadata
    }
}

/// A snapshot with lyrics and decoded art attached.
#[derive(Debug, Clone)]
pub struct EnrichedTrack {
    title: String,
    cleaned_title: String,
    artist: String,
    album: String,
    album_art: DynamicImage,
    lyrics: String,
}

impl EnrichedTrack {
    /// `cleaned_title` is the title the lyrics were looked up with.
    pub fn new(
        raw: RawTrackState,
        cleaned_title: String,
        lyrics: String,
        album_art: DynamicImage,
    ) -> Self {
        let PositionInfo {
            title,
            artist,
            album,
            ..
        } = raw.info;

        Self {
            title,
            cleaned_title,
            artist,
            album,
            album_art,
            lyrics,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cleaned_title(&self) -> &str {
        &self.cleaned_title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    pub fn album_art(&self) -> &DynamicImage {
        &self.album_art
    }

    pub fn lyrics(&self) -> &str {
        &self.lyrics
    }
}

/// Drop everything from the first `(` on, e.g. "Yesterday (Remastered 2009)"
/// becomes "Yesterday".
pub fn clean_title(title: &str) -> String {
    title.split('(').next().unwrap_or(title).trim().to_string()
}

/// Current playback of an already resolved zone.
pub async fn fetch(
    controller: &dyn ZoneController,
    zone: &ZoneHandle,
) -> Result<RawTrackState, TrackError> {
    let info = controller.position_info(zone).await?;

    match info.and_then(RawTrackState::from_position_info) {
        Some(raw) => {
            tracing::debug!(zone = zone.name(), title = raw.title(), "fetched track");
            Ok(raw)
        }
        None => Err(TrackError::NothingPlaying(zone.name().to_string())),
    }
}

/// Resolve `name`, then fetch its playback.
pub async fn fetch_by_name(
    controller: &dyn ZoneController,
    name: &str,
) -> Result<RawTrackState, TrackError> {
    let zone = zone::resolve(controller, name).await?;
    fetch(controller, &zone).await
}
