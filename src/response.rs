use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::io::Cursor;

use crate::track::{EnrichedTrack, RawTrackState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleTrackInfo {
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichTrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// PNG, standard base64.
    pub album_art: String,
    pub lyrics: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl From<&RawTrackState> for SimpleTrackInfo {
    fn from(raw: &RawTrackState) -> Self {
        Self {
            title: raw.title().to_string(),
            artist: raw.artist().to_string(),
        }
    }
}

impl RichTrackInfo {
    pub fn from_track(track: &EnrichedTrack) -> Result<Self> {
        Ok(Self {
            title: track.title().to_string(),
            artist: track.artist().to_string(),
            album: track.album().to_string(),
            album_art: encode_art(track.album_art())?,
            lyrics: track.lyrics().to_string(),
        })
    }
}

/// Re-encode as PNG and base64 it so it fits in a JSON string.
pub fn encode_art(image: &DynamicImage) -> Result<String> {
    // RGBA8 is always representable as PNG, whatever the source format was
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());

    let mut png = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("Failed to encode album art as PNG")?;

    Ok(STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::PositionInfo;
    use image::{Rgba, RgbaImage};

    fn beatles(title: &str) -> RawTrackState {
        RawTrackState::from_position_info(PositionInfo {
            title: title.to_string(),
            artist: "The Beatles".to_string(),
            album: "Help!".to_string(),
            ..PositionInfo::default()
        })
        .unwrap()
    }

    fn gradient() -> DynamicImage {
        let img = RgbaImage::from_fn(8, 6, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 200, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_simple_projection_keeps_raw_title() {
        let simple = SimpleTrackInfo::from(&beatles("Yesterday (Remastered 2009)"));
        assert_eq!(
            simple,
            SimpleTrackInfo {
                title: "Yesterday (Remastered 2009)".to_string(),
                artist: "The Beatles".to_string(),
            }
        );
    }

    #[test]
    fn test_rich_projection_fields() {
        let track = EnrichedTrack::new(
            beatles("Yesterday (Remastered 2009)"),
            "Yesterday".to_string(),
            "Yesterday".to_string(),
            gradient(),
        );
        let rich = RichTrackInfo::from_track(&track).unwrap();

        assert_eq!(rich.title, "Yesterday (Remastered 2009)");
        assert_eq!(rich.artist, "The Beatles");
        assert_eq!(rich.album, "Help!");
        assert_eq!(rich.lyrics, "Yesterday");
        assert!(!rich.album_art.is_empty());
    }

    #[test]
    fn test_album_art_decodes_to_same_pixels() {
        let original = gradient();
        let encoded = encode_art(&original).unwrap();

        let png = STANDARD.decode(encoded).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();

        assert_eq!(decoded.to_rgba8(), original.to_rgba8());
    }

    #[test]
    fn test_rgb_art_is_encoded_too() {
        let rgb = DynamicImage::new_rgb8(3, 3);
        let png = STANDARD.decode(encode_art(&rgb).unwrap()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.to_rgb8(), rgb.to_rgb8());
    }

    #[test]
    fn test_json_shapes() {
        let simple = serde_json::to_value(SimpleTrackInfo {
            title: "Yesterday".to_string(),
            artist: "The Beatles".to_string(),
        })
        .unwrap();
        assert_eq!(
            simple,
            serde_json::json!({"title": "Yesterday", "artist": "The Beatles"})
        );

        let message = serde_json::to_value(MessageBody {
            message: "No player named Garage.".to_string(),
        })
        .unwrap();
        assert_eq!(message, serde_json::json!({"message": "No player named Garage."}));
    }
}
