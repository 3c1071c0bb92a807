pub mod description;
pub mod soap;
pub mod sonos;
pub mod ssdp;
pub mod topology;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::TrackError;
use crate::track::PositionInfo;

/// A zone that answered discovery. Only valid for the request that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneHandle {
    name: String,
    base_url: String,
    av_transport_url: String,
}

impl ZoneHandle {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        av_transport_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            av_transport_url: av_transport_url.into(),
        }
    }

    /// Name the zone reports for itself, e.g. "Book Room".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `http://host:port` of the device, used to absolutize art URIs.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn av_transport_url(&self) -> &str {
        &self.av_transport_url
    }
}

/// Discovery and playback query for a family of network speakers.
#[async_trait]
pub trait ZoneController: Send + Sync {
    /// Every zone answering right now, in the order they answered.
    async fn discover(&self) -> Result<Vec<ZoneHandle>>;

    /// Raw playback fields, or `None` if the zone returned nothing at all.
    async fn position_info(&self, zone: &ZoneHandle) -> Result<Option<PositionInfo>>;
}

/// First discovered zone whose name matches `name` exactly.
pub async fn resolve(controller: &dyn ZoneController, name: &str) -> Result<ZoneHandle, TrackError> {
    let zones = controller.discover().await?;
    tracing::debug!(count = zones.len(), "discovered zones");

    zones
        .into_iter()
        .find(|zone| zone.name() == name)
        .ok_or_else(|| TrackError::ZoneNotFound(name.to_string()))
}
