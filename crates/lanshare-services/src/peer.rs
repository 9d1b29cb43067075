//! Peer registry: tracks nearby LanShare nodes.
//!
//! The registry is a concurrent map from (address, port) to PeerEntry,
//! populated by the discovery listener, pruned by the reaper, and read by
//! the local API. Writers race freely; the last write for a key wins.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Identity of a peer record. Two announcements with the same address and
/// port are the same peer, whatever username they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub addr: IpAddr,
    pub port: u16,
}

impl PeerKey {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

/// A peer as last seen in a discovery announcement.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    pub addr: IpAddr,
    /// HTTP port the peer serves the peer protocol on.
    pub port: u16,
    pub username: String,
    /// When this entry was last refreshed. Used for timeout eviction.
    pub last_seen: Instant,
}

impl PeerEntry {
    pub fn key(&self) -> PeerKey {
        PeerKey::new(self.addr, self.port)
    }

    /// `last_seen` as fractional Unix seconds, for display.
    pub fn last_seen_unix(&self) -> f64 {
        let wall = SystemTime::now()
            .checked_sub(self.last_seen.elapsed())
            .unwrap_or(UNIX_EPOCH);
        wall.duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// The peer registry, shared between the discovery tasks and the API.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    peers: Arc<DashMap<PeerKey, PeerEntry>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer. A refresh overwrites the username.
    ///
    /// Returns true if the key was not present before.
    pub fn upsert(&self, key: PeerKey, username: &str, now: Instant) -> bool {
        match self.peers.entry(key) {
            Entry::Occupied(mut e) => {
                let entry = e.get_mut();
                if entry.username != username {
                    entry.username = username.to_string();
                }
                entry.last_seen = now;
                false
            }
            Entry::Vacant(v) => {
                v.insert(PeerEntry {
                    addr: key.addr,
                    port: key.port,
                    username: username.to_string(),
                    last_seen: now,
                });
                true
            }
        }
    }

    /// Point-in-time snapshot of every known peer.
    pub fn list(&self) -> Vec<PeerEntry> {
        self.peers.iter().map(|e| e.value().clone()).collect()
    }

    pub fn get(&self, key: &PeerKey) -> Option<PeerEntry> {
        self.peers.get(key).map(|e| e.value().clone())
    }

    /// Remove every peer with `now - last_seen > timeout`. Returns the
    /// removed entries.
    pub fn evict_expired(&self, now: Instant, timeout: Duration) -> Vec<PeerEntry> {
        let mut removed = Vec::new();
        self.peers.retain(|_, entry| {
            let expired = now.saturating_duration_since(entry.last_seen) > timeout;
            if expired {
                removed.push(entry.clone());
            }
            !expired
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
