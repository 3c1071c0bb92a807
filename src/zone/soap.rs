//! UPnP SOAP plumbing: the `GetPositionInfo` action and the DIDL-Lite
//! metadata it carries.

use anyhow::{anyhow, Context, Result};
use quick_xml::escape::escape;
use serde::Deserialize;

use crate::track::PositionInfo;

pub const AV_TRANSPORT_SERVICE: &str = "urn:schemas-upnp-org:service:AVTransport:1";

// Value some players put in TrackMetaData when they have nothing to say
const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

pub fn build_soap_request(service_type: &str, action: &str, args: &[(&str, &str)]) -> String {
    let arguments: String = args
        .iter()
        .map(|(name, value)| format!("<{name}>{}</{name}>", escape(*value)))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_type}">{arguments}</u:{action}></s:Body></s:Envelope>"#
    )
}

/// POST a SOAP action and return the response body. Non-2xx replies are
/// errors carrying the UPnP fault code when the device sent one.
pub async fn invoke(
    http: &reqwest::Client,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String> {
    let body = build_soap_request(service_type, action, args);

    let response = http
        .post(control_url)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("SOAPAction", format!(r#""{service_type}#{action}""#))
        .body(body)
        .send()
        .await
        .with_context(|| format!("HTTP error when sending {action} to {control_url}"))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read {action} response from {control_url}"))?;

    if !status.is_success() {
        return Err(match parse_fault(&text) {
            Some(fault) => anyhow!("{action} returned UPnP error {fault} (HTTP status {status})"),
            None => anyhow!("{action} failed with HTTP status {status}"),
        });
    }

    Ok(text)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "s:Body", alias = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(
        rename = "u:GetPositionInfoResponse",
        alias = "GetPositionInfoResponse",
        default
    )]
    position_info: Option<PositionInfoResponse>,
    #[serde(rename = "s:Fault", alias = "Fault", default)]
    fault: Option<Fault>,
}

#[derive(Debug, Default, Deserialize)]
struct PositionInfoResponse {
    #[serde(rename = "Track", default)]
    track: String,
    #[serde(rename = "TrackDuration", default)]
    track_duration: String,
    #[serde(rename = "TrackMetaData", default)]
    track_metadata: String,
    #[serde(rename = "TrackURI", default)]
    track_uri: String,
    #[serde(rename = "RelTime", default)]
    rel_time: String,
}

#[derive(Debug, Deserialize)]
struct Fault {
    #[serde(default)]
    detail: Option<FaultDetail>,
}

#[derive(Debug, Deserialize)]
struct FaultDetail {
    #[serde(rename = "UPnPError", default)]
    upnp_error: Option<UpnpError>,
}

#[derive(Debug, Deserialize)]
struct UpnpError {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "errorDescription", default)]
    error_description: Option<String>,
}

/// "714" or "714: Illegal MIME-type" from a SOAP fault body.
fn parse_fault(xml: &str) -> Option<String> {
    let envelope: Envelope = quick_xml::de::from_str(xml).ok()?;
    let error = envelope.body.fault?.detail?.upnp_error?;
    let code = error.error_code?.trim().to_string();

    Some(match error.error_description {
        Some(desc) if !desc.trim().is_empty() => format!("{code}: {}", desc.trim()),
        _ => code,
    })
}

#[derive(Debug, Deserialize)]
struct DidlLite {
    #[serde(default)]
    item: Option<DidlItem>,
}

#[derive(Debug, Default, Deserialize)]
struct DidlItem {
    #[serde(rename = "dc:title", alias = "title", default)]
    title: Option<String>,
    #[serde(rename = "dc:creator", alias = "creator", default)]
    creator: Option<String>,
    #[serde(rename = "upnp:album", alias = "album", default)]
    album: Option<String>,
    #[serde(rename = "upnp:albumArtURI", alias = "albumArtURI", default)]
    album_art_uri: Option<String>,
    #[serde(rename = "r:streamContent", alias = "streamContent", default)]
    stream_content: Option<String>,
}

/// Track fields read out of a DIDL-Lite document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidlTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_art_uri: String,
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn parse_didl(metadata: &str) -> Result<DidlTrack> {
    let didl: DidlLite = quick_xml::de::from_str(metadata).context("Malformed DIDL-Lite metadata")?;
    let item = didl.item.unwrap_or_default();

    let mut track = DidlTrack {
        title: text(item.title),
        artist: text(item.creator),
        album: text(item.album),
        album_art_uri: text(item.album_art_uri),
    };

    // Radio streams put "Artist - Title" in streamContent and the station in dc:title
    let stream_content = text(item.stream_content);
    if !stream_content.is_empty() {
        match stream_content.split_once(" - ") {
            Some((artist, title)) => {
                track.artist = artist.trim().to_string();
                track.title = title.trim().to_string();
            }
            None if track.title.is_empty() => track.title = stream_content,
            None => {}
        }
    }

    Ok(track)
}

/// Art URIs are often device-relative (`/getaa?...`).
pub fn absolute_art_uri(base_url: &str, uri: &str) -> String {
    if uri.is_empty() || uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if uri.starts_with('/') {
        format!("{base}{uri}")
    } else {
        format!("{base}/{uri}")
    }
}

/// Turn a `GetPositionInfoResponse` envelope into the provider payload.
pub fn parse_position_info(xml: &str, base_url: &str) -> Result<PositionInfo> {
    let envelope: Envelope = quick_xml::de::from_str(xml).context("Malformed SOAP envelope")?;
    let response = envelope
        .body
        .position_info
        .ok_or_else(|| anyhow!("Missing GetPositionInfoResponse element in SOAP body"))?;

    let mut info = PositionInfo {
        position: response.rel_time.trim().to_string(),
        playlist_position: response.track.trim().to_string(),
        duration: response.track_duration.trim().to_string(),
        uri: response.track_uri.trim().to_string(),
        metadata: response.track_metadata.clone(),
        ..PositionInfo::default()
    };

    let metadata = response.track_metadata.trim();
    if !metadata.is_empty() && metadata != NOT_IMPLEMENTED {
        let didl = parse_didl(metadata)?;
        info.title = didl.title;
        info.artist = didl.artist;
        info.album = didl.album;
        info.album_art = absolute_art_uri(base_url, &didl.album_art_uri);
    }

    Ok(info)
}
