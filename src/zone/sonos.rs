use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};

use super::description::fetch_device_description;
use super::soap::{self, AV_TRANSPORT_SERVICE};
use super::ssdp::{self, ZONE_PLAYER_ST};
use super::topology::{self, ZoneMember, ZONE_GROUP_TOPOLOGY_PATH, ZONE_GROUP_TOPOLOGY_SERVICE};
use super::{ZoneController, ZoneHandle};
use crate::track::PositionInfo;

/// Sonos zone players over SSDP + UPnP/SOAP.
#[derive(Clone)]
pub struct SonosController {
    http: reqwest::Client,
    discovery_timeout: Duration,
}

impl SonosController {
    pub fn new(http_timeout: Duration, discovery_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lynos/", env!("CARGO_PKG_VERSION")))
            .timeout(http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            discovery_timeout,
        })
    }

    async fn describe(&self, location: &str) -> Result<ZoneHandle> {
        let description = fetch_device_description(&self.http, location).await?;

        let location_url =
            Url::parse(location).with_context(|| format!("Invalid LOCATION {location}"))?;
        let base_url = location_url.origin().ascii_serialization();
        let av_transport_url = location_url
            .join(&description.av_transport_control)
            .with_context(|| {
                format!(
                    "Invalid AVTransport control URL {}",
                    description.av_transport_control
                )
            })?;

        Ok(ZoneHandle::new(
            description.name,
            base_url,
            av_transport_url.to_string(),
        ))
    }

    /// Describe every location concurrently, skipping players that fail.
    async fn describe_all(&self, locations: &[String]) -> Vec<ZoneHandle> {
        let described = join_all(locations.iter().map(|l| self.describe(l))).await;

        let mut zones = Vec::with_capacity(described.len());
        for (location, result) in locations.iter().zip(described) {
            match result {
                Ok(zone) => {
                    debug!(zone = zone.name(), %location, "zone described");
                    zones.push(zone);
                }
                Err(e) => warn!(%location, "Skipping zone player: {e:#}"),
            }
        }

        zones
    }

    /// Household topology as seen by `zone`. Any player can answer for all.
    async fn topology(&self, zone: &ZoneHandle) -> Result<Vec<ZoneMember>> {
        let control_url = format!("{}{ZONE_GROUP_TOPOLOGY_PATH}", zone.base_url());
        let body = soap::invoke(
            &self.http,
            &control_url,
            ZONE_GROUP_TOPOLOGY_SERVICE,
            "GetZoneGroupState",
            &[],
        )
        .await?;

        topology::parse_topology_response(&body)
            .with_context(|| format!("Unreadable GetZoneGroupState reply from {}", zone.name()))
    }

    /// Drop satellites, Subs and paired secondaries. If the topology cannot
    /// be read every described player is kept.
    async fn visible_zones(&self, zones: Vec<ZoneHandle>) -> Vec<ZoneHandle> {
        let Some(first) = zones.first() else {
            return zones;
        };

        let members = self.topology(first).await;
        match members {
            Ok(members) => topology::visible_only(zones, &members),
            Err(e) => {
                warn!("Zone group topology unavailable, keeping every player: {e:#}");
                zones
            }
        }
    }
}

#[async_trait]
impl ZoneController for SonosController {
    async fn discover(&self) -> Result<Vec<ZoneHandle>> {
        let replies = ssdp::search(ZONE_PLAYER_ST, self.discovery_timeout).await?;
        let locations: Vec<String> = replies.into_iter().map(|r| r.location).collect();

        let zones = self.describe_all(&locations).await;
        Ok(self.visible_zones(zones).await)
    }

    async fn position_info(&self, zone: &ZoneHandle) -> Result<Option<PositionInfo>> {
        let body = soap::invoke(
            &self.http,
            zone.av_transport_url(),
            AV_TRANSPORT_SERVICE,
            "GetPositionInfo",
            &[("InstanceID", "0")],
        )
        .await?;

        let info = soap::parse_position_info(&body, zone.base_url())
            .with_context(|| format!("Unreadable GetPositionInfo reply from {}", zone.name()))?;

        Ok(Some(info))
    }
}
