use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Fallback when a description lists no AVTransport service.
pub const DEFAULT_AV_TRANSPORT_PATH: &str = "/MediaRenderer/AVTransport/Control";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// Zone name: `roomName` when present, else `friendlyName`.
    pub name: String,
    /// AVTransport control URL as written in the description (usually a path).
    pub av_transport_control: String,
}

#[derive(Debug, Deserialize)]
struct DescriptionRoot {
    device: Device,
}

#[derive(Debug, Deserialize)]
struct Device {
    #[serde(rename = "roomName", default)]
    room_name: Option<String>,
    #[serde(rename = "friendlyName", default)]
    friendly_name: Option<String>,
    #[serde(rename = "serviceList", default)]
    service_list: Option<ServiceList>,
    #[serde(rename = "deviceList", default)]
    device_list: Option<DeviceList>,
}

#[derive(Debug, Deserialize)]
struct ServiceList {
    #[serde(rename = "service", default)]
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(rename = "serviceType", default)]
    service_type: String,
    #[serde(rename = "controlURL", default)]
    control_url: String,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(rename = "device", default)]
    devices: Vec<Device>,
}

impl Device {
    // Depth-first: on Sonos the service lives in the embedded MediaRenderer
    fn av_transport_control(&self) -> Option<&str> {
        let own = self.service_list.iter().flat_map(|l| &l.services).find(|s| {
            s.service_type
                .to_ascii_lowercase()
                .contains("urn:schemas-upnp-org:service:avtransport:")
        });
        if let Some(service) = own {
            return Some(service.control_url.trim());
        }

        self.device_list
            .iter()
            .flat_map(|l| &l.devices)
            .find_map(|d| d.av_transport_control())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_device_description(xml: &str) -> Result<DeviceDescription> {
    let root: DescriptionRoot =
        quick_xml::de::from_str(xml).context("Malformed device description")?;
    let device = root.device;

    let name = non_empty(&device.room_name)
        .or_else(|| non_empty(&device.friendly_name))
        .ok_or_else(|| anyhow!("Device description has neither roomName nor friendlyName"))?
        .to_string();

    let av_transport_control = device
        .av_transport_control()
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_AV_TRANSPORT_PATH)
        .to_string();

    Ok(DeviceDescription {
        name,
        av_transport_control,
    })
}

pub async fn fetch_device_description(
    http: &reqwest::Client,
    location: &str,
) -> Result<DeviceDescription> {
    let body = http
        .get(location)
        .send()
        .await
        .with_context(|| format!("Failed to fetch device description at {location}"))?
        .error_for_status()
        .with_context(|| format!("Device description request to {location} failed"))?
        .text()
        .await
        .with_context(|| format!("Failed to read device description at {location}"))?;

    parse_device_description(&body)
}
