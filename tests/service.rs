use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use lynos::{
    art::ArtFetcher,
    enrich::Enricher,
    error::TrackError,
    lyrics::LyricsProvider,
    server::{router, AppState},
    track::PositionInfo,
    zone::{ZoneController, ZoneHandle},
};

/// Zones keyed by name; `None` means the zone is idle.
struct FakeZones {
    zones: HashMap<String, Option<PositionInfo>>,
}

#[async_trait]
impl ZoneController for FakeZones {
    async fn discover(&self) -> anyhow::Result<Vec<ZoneHandle>> {
        Ok(self
            .zones
            .keys()
            .map(|name| ZoneHandle::new(name.clone(), "http://10.0.0.2:1400", "http://10.0.0.2:1400/ctl"))
            .collect())
    }

    async fn position_info(&self, zone: &ZoneHandle) -> anyhow::Result<Option<PositionInfo>> {
        Ok(self.zones.get(zone.name()).cloned().flatten())
    }
}

struct UnreachableNetwork;

#[async_trait]
impl ZoneController for UnreachableNetwork {
    async fn discover(&self) -> anyhow::Result<Vec<ZoneHandle>> {
        Err(anyhow!("no route to multicast group"))
    }

    async fn position_info(&self, _zone: &ZoneHandle) -> anyhow::Result<Option<PositionInfo>> {
        unreachable!("discovery never succeeds")
    }
}

/// Discovery works, the playback query times out.
struct SilentZone;

#[async_trait]
impl ZoneController for SilentZone {
    async fn discover(&self) -> anyhow::Result<Vec<ZoneHandle>> {
        Ok(vec![ZoneHandle::new(
            "Book Room",
            "http://10.0.0.2:1400",
            "http://10.0.0.2:1400/ctl",
        )])
    }

    async fn position_info(&self, _zone: &ZoneHandle) -> anyhow::Result<Option<PositionInfo>> {
        Err(anyhow!("GetPositionInfo timed out"))
    }
}

struct FakeLyrics {
    calls: AtomicU32,
    answer: Option<&'static str>,
    fail: bool,
}

#[async_trait]
impl LyricsProvider for FakeLyrics {
    async fn search_lyrics(&self, _title: &str, _artist: &str) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("Genius returned 503"))
        } else {
            Ok(self.answer.map(str::to_string))
        }
    }
}

struct FakeArt(Option<DynamicImage>);

#[async_trait]
impl ArtFetcher for FakeArt {
    async fn fetch_art(&self, url: &str) -> Result<DynamicImage, TrackError> {
        self.0
            .clone()
            .ok_or_else(|| TrackError::art_unavailable(url, "404 Not Found"))
    }
}

fn cover() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(5, 5, |x, y| {
        Rgba([x as u8 * 50, y as u8 * 50, 128, 255])
    }))
}

fn yesterday() -> PositionInfo {
    PositionInfo {
        title: "Yesterday (Remastered 2009)".to_string(),
        artist: "The Beatles".to_string(),
        album: "Help!".to_string(),
        album_art: "http://10.0.0.2:1400/getaa?s=1&u=x-sonos-spotify".to_string(),
        ..PositionInfo::default()
    }
}

fn book_room(playing: Option<PositionInfo>) -> Arc<FakeZones> {
    Arc::new(FakeZones {
        zones: HashMap::from([
            ("Book Room".to_string(), playing),
            ("Kitchen".to_string(), None),
        ]),
    })
}

fn lyrics(answer: Option<&'static str>, fail: bool) -> Arc<FakeLyrics> {
    Arc::new(FakeLyrics {
        calls: AtomicU32::new(0),
        answer,
        fail,
    })
}

fn app(zones: Arc<dyn ZoneController>, lyrics: Arc<FakeLyrics>, art: Option<DynamicImage>) -> Router {
    let enricher = Enricher::new(lyrics, Arc::new(FakeArt(art))).with_retry_backoff(Duration::ZERO);
    router(AppState::new(zones, enricher))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_root_is_a_teapot() {
    let app = app(book_room(None), lyrics(None, false), None);
    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("I am a teapot"));
}

#[tokio::test]
async fn test_simple_track_info_playing() {
    let app = app(book_room(Some(yesterday())), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"title": "Yesterday (Remastered 2009)", "artist": "The Beatles"})
    );
}

#[tokio::test]
async fn test_simple_track_info_ignores_enrichment_failures() {
    let provider = lyrics(None, true);
    let app = app(book_room(Some(yesterday())), provider.clone(), None);
    let (status, _) = get(app, "/simple_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rich_track_info_nothing_playing() {
    let app = app(book_room(None), lyrics(Some("words"), false), Some(cover()));
    let (status, body) = get(app, "/rich_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(
        body,
        json!({"message": "The player at Book Room is not playing anything."})
    );
}

#[tokio::test]
async fn test_empty_title_counts_as_nothing_playing() {
    let idle = PositionInfo {
        title: String::new(),
        ..yesterday()
    };
    let app = app(book_room(Some(idle)), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(
        body["message"],
        "The player at Book Room is not playing anything."
    );
}

#[tokio::test]
async fn test_blank_title_is_reported_as_is() {
    let blank = PositionInfo {
        title: "   ".to_string(),
        ..yesterday()
    };
    let app = app(book_room(Some(blank)), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"title": "   ", "artist": "The Beatles"}));
}

#[tokio::test]
async fn test_unknown_zone() {
    let app = app(book_room(Some(yesterday())), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/Garage").await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, json!({"message": "No player named Garage."}));
}

#[tokio::test]
async fn test_zone_names_are_case_sensitive() {
    let app = app(book_room(Some(yesterday())), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/book%20room").await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body["message"], "No player named book room.");
}

#[tokio::test]
async fn test_rich_track_info_lyrics_failure_is_a_server_error() {
    let provider = lyrics(None, true);
    let app = app(book_room(Some(yesterday())), provider.clone(), Some(cover()));
    let (status, body) = get(app, "/rich_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal Server Error"}));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rich_track_info_art_failure_is_a_server_error() {
    let app = app(book_room(Some(yesterday())), lyrics(Some("words"), false), None);
    let (status, body) = get(app, "/rich_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn test_discovery_failure_is_a_server_error() {
    let app = app(Arc::new(UnreachableNetwork), lyrics(None, false), None);
    let (status, body) = get(app, "/simple_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn test_playback_query_failure_is_a_server_error() {
    for uri in ["/simple_track_info/Book%20Room", "/rich_track_info/Book%20Room"] {
        let app = app(Arc::new(SilentZone), lyrics(Some("words"), false), Some(cover()));
        let (status, body) = get(app, uri).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "for {uri}");
        assert_eq!(body, json!({"message": "Internal Server Error"}));
    }
}

#[tokio::test]
async fn test_rich_track_info_success() {
    let provider = lyrics(Some("Yesterday\nAll my troubles seemed so far away"), false);
    let app = app(book_room(Some(yesterday())), provider, Some(cover()));
    let (status, body) = get(app, "/rich_track_info/Book%20Room").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Yesterday (Remastered 2009)");
    assert_eq!(body["artist"], "The Beatles");
    assert_eq!(body["album"], "Help!");
    assert_eq!(body["lyrics"], "Yesterday\nAll my troubles seemed so far away");

    let png = STANDARD.decode(body["album_art"].as_str().unwrap()).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.to_rgba8(), cover().to_rgba8());
}
