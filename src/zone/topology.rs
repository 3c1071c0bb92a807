//! Household layout from `ZoneGroupTopology#GetZoneGroupState`.
//!
//! Every Sonos box answers M-SEARCH, including home-theater satellites, Subs
//! and the second speaker of a stereo pair. They report the room name of the
//! zone they belong to, but only the visible member plays the zone's queue.
//! The topology marks the others with `Invisible="1"`.

use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;

use super::ZoneHandle;

pub const ZONE_GROUP_TOPOLOGY_SERVICE: &str = "urn:schemas-upnp-org:service:ZoneGroupTopology:1";
pub const ZONE_GROUP_TOPOLOGY_PATH: &str = "/ZoneGroupTopology/Control";

/// One player as the topology lists it. Satellites are flattened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMember {
    pub uuid: String,
    pub zone_name: String,
    pub location: String,
    pub invisible: bool,
}

impl ZoneMember {
    /// `http://host:port` of the player, comparable with `ZoneHandle::base_url`.
    pub fn origin(&self) -> Option<String> {
        Url::parse(&self.location)
            .ok()
            .map(|url| url.origin().ascii_serialization())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "s:Body", alias = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(
        rename = "u:GetZoneGroupStateResponse",
        alias = "GetZoneGroupStateResponse",
        default
    )]
    response: Option<StateResponse>,
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    #[serde(rename = "ZoneGroupState", default)]
    state: String,
}

// Newer firmware wraps the groups in <ZoneGroupState><ZoneGroups>, older
// firmware returns <ZoneGroups> as the root.
#[derive(Debug, Default, Deserialize)]
struct GroupState {
    #[serde(rename = "ZoneGroups", default)]
    zone_groups: Option<ZoneGroups>,
    #[serde(rename = "ZoneGroup", default)]
    groups: Vec<ZoneGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct ZoneGroups {
    #[serde(rename = "ZoneGroup", default)]
    groups: Vec<ZoneGroup>,
}

#[derive(Debug, Deserialize)]
struct ZoneGroup {
    #[serde(rename = "ZoneGroupMember", default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "@UUID", default)]
    uuid: String,
    #[serde(rename = "@ZoneName", default)]
    zone_name: String,
    #[serde(rename = "@Location", default)]
    location: String,
    #[serde(rename = "@Invisible", default)]
    invisible: Option<String>,
    #[serde(rename = "Satellite", default)]
    satellites: Vec<Member>,
}

impl Member {
    fn flatten_into(self, out: &mut Vec<ZoneMember>) {
        out.push(ZoneMember {
            uuid: self.uuid,
            zone_name: self.zone_name,
            location: self.location,
            invisible: self.invisible.as_deref().map(str::trim) == Some("1"),
        });
        for satellite in self.satellites {
            satellite.flatten_into(out);
        }
    }
}

/// Every member and satellite in the (already unescaped) ZoneGroupState XML.
pub fn parse_zone_group_state(xml: &str) -> Result<Vec<ZoneMember>> {
    let state: GroupState = quick_xml::de::from_str(xml).context("Malformed ZoneGroupState")?;

    let mut members = Vec::new();
    let groups = state
        .zone_groups
        .map(|g| g.groups)
        .unwrap_or_default()
        .into_iter()
        .chain(state.groups);
    for group in groups {
        for member in group.members {
            member.flatten_into(&mut members);
        }
    }

    Ok(members)
}

/// Members out of a `GetZoneGroupStateResponse` SOAP envelope.
pub fn parse_topology_response(xml: &str) -> Result<Vec<ZoneMember>> {
    let envelope: Envelope = quick_xml::de::from_str(xml).context("Malformed SOAP envelope")?;
    let response = envelope
        .body
        .response
        .ok_or_else(|| anyhow!("Missing GetZoneGroupStateResponse element in SOAP body"))?;

    parse_zone_group_state(response.state.trim())
}

/// Drop zone players the topology marks invisible. Order is kept.
pub fn visible_only(zones: Vec<ZoneHandle>, members: &[ZoneMember]) -> Vec<ZoneHandle> {
    let hidden: HashSet<String> = members
        .iter()
        .filter(|m| m.invisible)
        .filter_map(ZoneMember::origin)
        .collect();

    zones
        .into_iter()
        .filter(|zone| {
            let visible = !hidden.contains(zone.base_url());
            if !visible {
                tracing::debug!(zone = zone.name(), base_url = zone.base_url(), "hiding bonded player");
            }
            visible
        })
        .collect()
}
