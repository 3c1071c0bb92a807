//! SSDP search for zone players.
//!
//! We act as a control point only: bind an ephemeral UDP port, multicast an
//! `M-SEARCH`, and collect the unicast `HTTP/1.1 200 OK` replies until the
//! listen window closes. Nothing binds port 1900.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;
pub const ZONE_PLAYER_ST: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

// UDP is lossy; a second datagram costs nothing
const MSEARCH_REPEATS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub location: String,
    pub usn: String,
    pub st: String,
    pub server: String,
}

pub fn build_msearch(st: &str, mx: u32) -> String {
    let mx = mx.max(1);
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST_ADDR}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {st}\r\n\
         \r\n"
    )
}

/// Parse a unicast search reply. Anything else (NOTIFY, other M-SEARCHes,
/// error statuses, replies without LOCATION) yields `None`.
pub fn parse_search_response(data: &str) -> Option<SearchResponse> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim().to_ascii_uppercase();
    if !(first_line.starts_with("HTTP/") && first_line.contains(" 200")) {
        return None;
    }

    let headers = parse_headers(lines);
    let location = headers.get("LOCATION")?.to_string();
    if location.is_empty() {
        return None;
    }

    Some(SearchResponse {
        location,
        usn: headers.get("USN").cloned().unwrap_or_default(),
        st: headers.get("ST").cloned().unwrap_or_default(),
        server: headers.get("SERVER").cloned().unwrap_or_default(),
    })
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_uppercase(), value.trim().to_string()))
        })
        .collect()
}

/// Search for devices of type `st` for `window`, one reply per LOCATION,
/// in arrival order.
pub async fn search(st: &str, window: Duration) -> Result<Vec<SearchResponse>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("Failed to bind SSDP socket")?;

    let target = SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT));
    let mx = window.as_secs().clamp(1, 5) as u32;
    let msg = build_msearch(st, mx);
    for _ in 0..MSEARCH_REPEATS {
        socket
            .send_to(msg.as_bytes(), target)
            .await
            .context("Failed to send M-SEARCH")?;
    }
    debug!(st, mx, "M-SEARCH sent");

    let deadline = Instant::now() + window;
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let (n, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => break,
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                warn!("SSDP read error: {e}");
                break;
            }
        };

        let data = String::from_utf8_lossy(&buf[..n]);
        match parse_search_response(&data) {
            Some(reply) if reply.st.eq_ignore_ascii_case(st) => {
                if seen.insert(reply.location.clone()) {
                    debug!(%from, location = %reply.location, "zone player answered");
                    found.push(reply);
                }
            }
            _ => trace!(%from, "ignoring SSDP datagram"),
        }
    }

    Ok(found)
}
