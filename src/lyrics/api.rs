use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use urlencoding::encode;

use super::{parser, LyricsProvider, SearchEnvelope, SearchResults};

const API_BASE_URL: &str = "https://api.genius.com";

/// Genius search API plus lyrics-page scraping.
#[derive(Clone)]
pub struct GeniusClient {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl GeniusClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lynos/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build Genius HTTP client")?;

        Ok(Self {
            client,
            api_base: API_BASE_URL.to_string(),
            access_token: access_token.into(),
        })
    }

    /// Point the search API somewhere else (a mock server in tests).
    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn search(&self, title: &str, artist: &str) -> Result<SearchResults> {
        let query = format!("{title} {artist}");
        let url = format!("{}/search?q={}", self.api_base, encode(query.trim()));

        let envelope = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Genius search request failed")?
            .error_for_status()
            .context("Genius search rejected")?
            .json::<SearchEnvelope>()
            .await
            .context("Unexpected Genius search payload")?;

        Ok(envelope.response)
    }

    pub async fn fetch_song_page(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch lyrics page {url}"))?
            .error_for_status()
            .with_context(|| format!("Lyrics page {url} rejected"))?
            .text()
            .await
            .with_context(|| format!("Failed to read lyrics page {url}"))
    }
}

#[async_trait]
impl LyricsProvider for GeniusClient {
    async fn search_lyrics(&self, title: &str, artist: &str) -> Result<Option<String>> {
        let results = self.search(title, artist).await?;

        let Some(song) = results.best_match(artist) else {
            tracing::debug!(title, artist, "no Genius hit");
            return Ok(None);
        };

        tracing::debug!(id = song.id, url = %song.url, "Genius hit");
        let html = self.fetch_song_page(&song.url).await?;
        Ok(parser::extract_lyrics(&html))
    }
}
