//! LanShare wire format: the discovery datagram and the JSON bodies of the
//! peer protocol.
//!
//! Discovery datagrams are UTF-8 JSON sent to a multicast group:
//!
//! ```text
//! { "type": "discovery", "username": "alice", "port": 19001, "ip": "192.168.1.20" }
//! ```
//!
//! `ip` is optional. When present, receivers use it instead of the UDP source
//! address, because a multi-homed sender does not present the same source
//! address to every receiver.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Default multicast group for discovery.
pub const DEFAULT_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Default UDP port every node binds for discovery.
pub const DEFAULT_MULTICAST_PORT: u16 = 19000;

/// Default HTTP port for the peer protocol and local API.
pub const DEFAULT_SERVER_PORT: u16 = 19001;

/// Longest username accepted for our own identity. Keeps the encoded
/// announcement well inside the 1024-byte receive buffer.
pub const MAX_USERNAME_LEN: usize = 64;

/// Value of the `type` field for discovery announcements.
pub const DISCOVERY_TYPE: &str = "discovery";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Not JSON, or a field had the wrong JSON type.
    #[error("malformed datagram: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A required field was missing, null, empty, or zero.
    #[error("incomplete announcement: missing {0}")]
    Incomplete(&'static str),
    #[error("invalid ip field: {0:?}")]
    BadAddress(String),
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// A validated discovery announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    pub username: String,
    /// HTTP port the sender serves the peer protocol on.
    pub port: u16,
    /// Sender's own idea of its LAN address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Tagged<'a> {
    Discovery(&'a DiscoveryMessage),
}

/// Loosely-typed view of an incoming datagram. Every field is optional so
/// that validation happens in one place, in [`DiscoveryMessage::decode`].
#[derive(Deserialize)]
struct RawDatagram {
    #[serde(rename = "type")]
    kind: Option<String>,
    username: Option<String>,
    port: Option<u16>,
    /// Outer `None`: key absent. `Some(None)`: key present but null.
    #[serde(default, deserialize_with = "present")]
    ip: Option<Option<String>>,
}

/// Deserialize a field that was present in the input, keeping an explicit
/// `null` distinct from an absent key.
fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

impl DiscoveryMessage {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(&Tagged::Discovery(self))?)
    }

    /// Decode a datagram.
    ///
    /// Returns `Ok(None)` for well-formed JSON whose `type` is not
    /// `"discovery"`; such datagrams are ignored. A missing `ip` key means
    /// "use the source address"; an `ip` that is present but null or empty
    /// is incomplete.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>, WireError> {
        let raw: RawDatagram = serde_json::from_slice(buf)?;
        if raw.kind.as_deref() != Some(DISCOVERY_TYPE) {
            return Ok(None);
        }

        let username = raw
            .username
            .filter(|u| !u.is_empty())
            .ok_or(WireError::Incomplete("username"))?;
        let port = raw
            .port
            .filter(|p| *p != 0)
            .ok_or(WireError::Incomplete("port"))?;
        let ip = match raw.ip {
            None => None,
            Some(None) => return Err(WireError::Incomplete("ip")),
            Some(Some(s)) if s.is_empty() => return Err(WireError::Incomplete("ip")),
            Some(Some(s)) => Some(s.parse().map_err(|_| WireError::BadAddress(s))?),
        };

        Ok(Some(Self { username, port, ip }))
    }
}

// ── Peer protocol bodies ──────────────────────────────────────────────────────

/// `GET /p2p/hello` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
    pub username: String,
    pub server_port: u16,
}

/// One entry of `GET /p2p/list_files`. Never carries the local path or the
/// password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub has_password: bool,
}

/// `POST /p2p/download_file/{id}` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Error body used by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
