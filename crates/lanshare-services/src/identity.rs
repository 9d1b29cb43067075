//! This node's own identity: the name and port it announces, and its best
//! guess at its LAN address.
//!
//! Read by the discovery broadcaster and listener on every datagram and by
//! the peer protocol's hello request; written by the local API.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, RwLock};

use lanshare_core::wire::MAX_USERNAME_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    /// HTTP port announced to peers.
    pub advertised_port: u16,
    pub local_ip: Option<IpAddr>,
}

impl Identity {
    /// True if `addr` could be one of our own addresses: the detected LAN
    /// address or any loopback address.
    pub fn is_local_addr(&self, addr: IpAddr) -> bool {
        addr.is_loopback() || self.local_ip == Some(addr)
    }

    /// True only when address, port, and username all match ours.
    pub fn is_self(&self, addr: IpAddr, port: u16, username: &str) -> bool {
        self.is_local_addr(addr) && port == self.advertised_port && username == self.username
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("username is required")]
    EmptyUsername,
    #[error("username longer than {MAX_USERNAME_LEN} characters")]
    UsernameTooLong,
}

/// Validate and normalise a username.
pub fn validate_username(raw: &str) -> Result<String, IdentityError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(IdentityError::EmptyUsername);
    }
    if name.chars().count() > MAX_USERNAME_LEN {
        return Err(IdentityError::UsernameTooLong);
    }
    Ok(name.to_string())
}

/// Shared, mutable identity.
#[derive(Clone)]
pub struct IdentityHandle {
    inner: Arc<RwLock<Identity>>,
}

impl IdentityHandle {
    pub fn new(identity: Identity) -> Self {
        Self {
            inner: Arc::new(RwLock::new(identity)),
        }
    }

    /// Snapshot of the current identity.
    pub fn get(&self) -> Identity {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Change the announced username and record a fresh local address guess.
    ///
    /// Callers on the async runtime should run [`detect_local_ip`] through
    /// `spawn_blocking`. Only the announced `ip` follows `local_ip`; the
    /// discovery socket's multicast interface stays the one chosen at startup.
    pub fn set_username(&self, raw: &str, local_ip: IpAddr) -> Result<Identity, IdentityError> {
        let username = validate_username(raw)?;
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.username = username;
        guard.local_ip = Some(local_ip);
        tracing::info!(username = %guard.username, local_ip = %local_ip, "identity updated");
        Ok(guard.clone())
    }

    /// Record the port the HTTP server actually bound.
    pub fn set_advertised_port(&self, port: u16) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .advertised_port = port;
    }
}

// ── Local address ─────────────────────────────────────────────────────────────

/// Best guess at this machine's LAN-facing IPv4 address.
///
/// Prefers private (RFC 1918) addresses, then any non-loopback address,
/// and falls back to 127.0.0.1.
pub fn detect_local_ip() -> IpAddr {
    let mut candidates: Vec<Ipv4Addr> = Vec::new();

    if let Ok(IpAddr::V4(v4)) = local_ip_address::local_ip() {
        candidates.push(v4);
    }
    match local_ip_address::list_afinet_netifas() {
        Ok(ifaces) => {
            for (_, ip) in ifaces {
                if let IpAddr::V4(v4) = ip {
                    if !candidates.contains(&v4) {
                        candidates.push(v4);
                    }
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not enumerate network interfaces"),
    }

    let chosen = pick_lan_ip(&candidates);
    tracing::debug!(?candidates, chosen = %chosen, "selected local address");
    IpAddr::V4(chosen)
}

/// Pick the LAN address from a candidate list, in preference order.
pub fn pick_lan_ip(candidates: &[Ipv4Addr]) -> Ipv4Addr {
    let usable = || {
        candidates
            .iter()
            .copied()
            .filter(|ip| !ip.is_loopback() && !ip.is_unspecified() && !ip.is_link_local())
    };
    usable()
        .find(|ip| ip.is_private())
        .or_else(|| usable().next())
        .unwrap_or(Ipv4Addr::LOCALHOST)
}
