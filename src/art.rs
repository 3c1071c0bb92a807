use anyhow::{Context, Result};
use async_trait::async_trait;
use image::DynamicImage;
use std::time::Duration;

use crate::error::TrackError;

/// Fetches and decodes album art.
#[async_trait]
pub trait ArtFetcher: Send + Sync {
    async fn fetch_art(&self, url: &str) -> Result<DynamicImage, TrackError>;
}

#[derive(Clone)]
pub struct HttpArtFetcher {
    client: reqwest::Client,
}

impl HttpArtFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lynos/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build art HTTP client")?;

        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ArtFetcher for HttpArtFetcher {
    async fn fetch_art(&self, url: &str) -> Result<DynamicImage, TrackError> {
        if url.is_empty() {
            return Err(TrackError::art_unavailable(url, "track has no album art"));
        }

        let bytes = self
            .download(url)
            .await
            .map_err(|e| TrackError::art_unavailable(url, format!("{e:#}")))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| TrackError::art_unavailable(url, e))?;

        tracing::debug!(url, width = image.width(), height = image.height(), "album art decoded");
        Ok(image)
    }
}
